//! Interned byte strings with pointer-equal identity.
//!
//! The real interning table is an external collaborator (§1): some upstream
//! parser is expected to hand every file revision the *same* `Atom` instance
//! whenever it sees the same path again. This module only provides the
//! contract type and the comparisons the engine needs; it does not itself
//! deduplicate anything beyond what `Atom::new` is given.

use bstr::BStr;
use bstr::BString;
use std::sync::Arc;

/// A byte string whose equality is identity, not content: two atoms compare
/// equal iff they are clones of the same underlying allocation.
#[derive(Clone, Debug)]
pub struct Atom(Arc<BString>);

impl Atom {
    pub fn new(bytes: impl Into<BString>) -> Self {
        Atom(Arc::new(bytes.into()))
    }

    pub fn as_bstr(&self) -> &BStr {
        self.0.as_ref().as_ref()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Atom {}

/// Ordering and hashing fall back to the byte content, since atoms need to
/// sort into deep-lexicographic path order (§3 invariant on `Directory`) even
/// though equality is identity-based.
impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_slice().cmp(other.0.as_slice())
    }
}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_slice().hash(state);
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_bstr())
    }
}

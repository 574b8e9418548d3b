//! §3 data model: file revisions, directories, commits, tags, branch heads.
//!
//! The engine is single-threaded (§5), so the shared, mutable bookkeeping
//! fields (`serial`, `emitted`, the transient `other` back-reference) use
//! `Rc`/`Cell`/`RefCell` rather than their atomic/`Arc` counterparts.

use crate::atom::Atom;
use crate::bloom::Bloom;
use crate::mark::Serial;
use bstr::BString;
use std::cell::Cell;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::rc::Weak;

/// A CVS-style dotted revision number, e.g. `1.2.3.4`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RevisionNumber(Vec<u32>);

impl RevisionNumber {
    pub fn new(components: impl Into<Vec<u32>>) -> Self {
        RevisionNumber(components.into())
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// A single file's contents as of one commit. Shared by `Rc` across every
/// commit that contains an unchanged copy, so pointer equality of the `Rc`
/// (not of this struct's fields) is what "the same file revision" means.
pub struct FileRevisionData {
    pub name: Atom,
    pub revision: RevisionNumber,
    pub executable: bool,
    serial: Cell<Option<Serial>>,
    emitted: Cell<bool>,
    /// Transient cross-commit back-reference, valid only for the duration of
    /// one `compute_parent_links` call (§4.4). `Weak` so that the reciprocal
    /// pointers between a commit's and its parent's file lists never keep
    /// either side alive on their own.
    other: RefCell<Option<Weak<FileRevisionData>>>,
}

pub type FileRevision = Rc<FileRevisionData>;

impl FileRevisionData {
    pub fn new(name: Atom, revision: RevisionNumber, executable: bool) -> FileRevision {
        Rc::new(FileRevisionData {
            name,
            revision,
            executable,
            serial: Cell::new(None),
            emitted: Cell::new(false),
            other: RefCell::new(None),
        })
    }

    pub fn serial(&self) -> Option<Serial> {
        self.serial.get()
    }

    /// Assigned once, when the blob generator first produces this file's
    /// contents (§3 lifecycle). Panics if called twice, since that would
    /// indicate the generator replayed a file revision it had already
    /// produced a serial for.
    pub fn assign_serial(&self, serial: Serial) {
        assert!(
            self.serial.replace(Some(serial)).is_none(),
            "serial assigned twice for the same file revision"
        );
    }

    pub fn is_emitted(&self) -> bool {
        self.emitted.get()
    }

    pub fn mark_emitted(&self) {
        self.emitted.set(true);
    }

    pub fn other(&self) -> Option<FileRevision> {
        self.other.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_other(&self, other: Option<&FileRevision>) {
        *self.other.borrow_mut() = other.map(Rc::downgrade);
    }

    pub fn clear_other(&self) {
        *self.other.borrow_mut() = None;
    }
}

/// One (commit, directory-path) pair: a sequence of file revisions sorted by
/// interned name. Immutable after construction.
#[derive(Clone)]
pub struct Directory {
    files: Vec<FileRevision>,
}

impl Directory {
    /// `files` must already be sorted by `FileRevisionData::name`; this is a
    /// caller invariant from the (external) parser, not re-checked here for
    /// every commit on the hot path, but verified in debug builds.
    pub fn new(files: Vec<FileRevision>) -> Self {
        debug_assert!(
            files.windows(2).all(|w| w[0].name <= w[1].name),
            "Directory files must be sorted by name"
        );
        Directory { files }
    }

    pub fn files(&self) -> &[FileRevision] {
        &self.files
    }
}

/// Number of seconds between the Unix epoch and the RCS epoch used by
/// `Commit::date`, matching cvs-fast-export's `RCS_EPOCH` (1970-01-01, i.e.
/// zero — CVS timestamps are already Unix seconds in practice, but the field
/// is kept distinct from `date` so the addition in `display_date` (§4.6)
/// stays visible at the call site).
pub const RCS_EPOCH: i64 = 0;

pub struct Commit {
    pub author: Atom,
    pub log: BString,
    /// Seconds, RCS-epoch-relative (see `RCS_EPOCH`).
    pub date: i64,
    pub parent: Option<Rc<Commit>>,
    /// True if this commit is the boundary of the exported range: its own
    /// file state is not re-exported because an earlier head already
    /// covered it.
    pub tail: bool,
    /// Sorted deep-lexicographic by path across (directory, file) pairs.
    pub dirs: Vec<Directory>,
    pub bloom: Bloom,
    serial: Cell<Option<Serial>>,
}

impl Commit {
    pub fn new(
        author: Atom,
        log: BString,
        date: i64,
        parent: Option<Rc<Commit>>,
        tail: bool,
        dirs: Vec<Directory>,
        bloom: Bloom,
    ) -> Rc<Commit> {
        Rc::new(Commit {
            author,
            log,
            date,
            parent,
            tail,
            dirs,
            bloom,
            serial: Cell::new(None),
        })
    }

    pub fn serial(&self) -> Option<Serial> {
        self.serial.get()
    }

    pub fn assign_serial(&self, serial: Serial) {
        assert!(
            self.serial.replace(Some(serial)).is_none(),
            "serial assigned twice for the same commit"
        );
    }

    /// Iterates file revisions in deep lexicographic path order: directory
    /// by directory, then file by file within each (§4.4).
    pub fn iter_files(&self) -> impl Iterator<Item = &FileRevision> {
        self.dirs.iter().flat_map(|d| d.files().iter())
    }

    pub fn grandparent(&self) -> Option<&Rc<Commit>> {
        self.parent.as_ref()?.parent.as_ref()
    }
}

pub struct Tag {
    pub name: BString,
    pub commit: Rc<Commit>,
}

pub struct BranchHead {
    pub ref_name: BString,
    pub commit: Rc<Commit>,
    /// True if this head's history is already covered by an earlier head
    /// (no duplicate emission).
    pub tail: bool,
}

impl BranchHead {
    /// Walks from the tip back through `parent`, including the first commit
    /// flagged `tail` and stopping there — that commit is shared with an
    /// already-exported branch, so its own ancestry must not be re-walked.
    pub fn commits_newest_first(&self) -> Vec<Rc<Commit>> {
        let mut out = Vec::new();
        let mut cur = Some(self.commit.clone());
        while let Some(c) = cur {
            let tail = c.tail;
            let parent = c.parent.clone();
            out.push(c);
            if tail {
                break;
            }
            cur = parent;
        }
        out
    }

    pub fn branch_length(&self) -> usize {
        self.commits_newest_first().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_number_displays_dotted() {
        assert_eq!(RevisionNumber::new(vec![1, 2, 3, 4]).to_string(), "1.2.3.4");
    }

    #[test]
    fn branch_head_stops_at_tail() {
        let root = Commit::new(
            Atom::new("ada"),
            "root".into(),
            0,
            None,
            false,
            vec![],
            Bloom::empty(),
        );
        let tail_commit = Commit::new(
            Atom::new("ada"),
            "tail".into(),
            1,
            Some(root),
            true,
            vec![],
            Bloom::empty(),
        );
        let tip = Commit::new(
            Atom::new("ada"),
            "tip".into(),
            2,
            Some(tail_commit),
            false,
            vec![],
            Bloom::empty(),
        );
        let head = BranchHead {
            ref_name: "refs/heads/master".into(),
            commit: tip,
            tail: false,
        };
        let commits = head.commits_newest_first();
        assert_eq!(commits.len(), 2, "tail commit is the last one included");
    }
}

//! Per-commit Bloom filter (C4 helper).
//!
//! Construction — deciding which bits to set for a given filename — is the
//! job of the (external, out-of-scope) Bloom-filter constructor that builds
//! commits in the first place. This module only carries the fixed-width bit
//! vector representation and the consumption-side operation the parent-link
//! computer needs: a cheap, never-false-negative "could this name be in the
//! other filter" test.

/// Number of `u64` words backing the filter. Mirrors cvs-fast-export's
/// `BLOOMLENGTH`: wide enough to keep false-positive aggregation rare across
/// a commit with a few thousand files without costing much memory per commit.
pub const BLOOM_WORDS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bloom {
    words: [u64; BLOOM_WORDS],
}

impl Bloom {
    pub const fn empty() -> Self {
        Bloom {
            words: [0; BLOOM_WORDS],
        }
    }

    /// Sets the bits a hash of `name` maps to. This is the minimal "external
    /// constructor" stand-in used by tests and the demo scene loader; a real
    /// CVS parser would likely compute something cheaper incrementally.
    pub fn insert(&mut self, name: &[u8]) {
        for bit in Self::bits_for(name) {
            self.words[bit / 64] |= 1 << (bit % 64);
        }
    }

    /// Bitwise-OR of this filter with every file's individual filter, i.e.
    /// the parent's *aggregate* filter used for the disjointness prefilter in
    /// `compute_parent_links`.
    pub fn union(&mut self, other: &Bloom) {
        for i in 0..BLOOM_WORDS {
            self.words[i] |= other.words[i];
        }
    }

    /// True if `self` and `other` share no set bit, i.e. `name` is
    /// *definitely absent* — a may-contain oracle that never falsely says no.
    pub fn is_disjoint(&self, other: &Bloom) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    fn bits_for(name: &[u8]) -> [usize; 3] {
        let total_bits = BLOOM_WORDS * 64;
        let h1 = fnv1a(name, 0xcbf29ce484222325);
        let h2 = fnv1a(name, 0x100000001b3);
        let h3 = h1.wrapping_mul(h2).wrapping_add(1);
        [
            (h1 as usize) % total_bits,
            (h2 as usize) % total_bits,
            (h3 as usize) % total_bits,
        ]
    }
}

/// Tiny FNV-1a variant seeded differently per call so three independent-ish
/// bit positions come out of one hash family without pulling in a crate.
fn fnv1a(data: &[u8], seed: u64) -> u64 {
    let mut hash = seed;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Convenience for building a commit's own Bloom filter from its file names.
pub fn bloom_for_names<'a>(names: impl IntoIterator<Item = &'a [u8]>) -> Bloom {
    let mut bloom = Bloom::empty();
    for name in names {
        bloom.insert(name);
    }
    bloom
}

//! C4: parent-link computation (§4.4).
//!
//! A commit's fileops are the *difference* between its file list and its
//! parent's: files present in both with the same revision are untouched,
//! files whose revision changed (or that are new) need an `M` fileop, and
//! files present only in the parent need a `D` fileop. Since both file lists
//! are already sorted deep-lexicographically, the comparison is a single
//! merge-join pass — `original_source/export.c`'s `compute_parent_links` —
//! with the per-commit Bloom filter as a cheap whole-commit disjointness
//! prefilter before touching either list.

use crate::model::Commit;
use crate::model::FileRevision;

/// Result of linking a commit's files against its parent's.
pub struct ParentLinks {
    /// Parent file revisions with no same-name counterpart in `commit`:
    /// these need a `D` fileop.
    pub removed: Vec<FileRevision>,
}

/// Links every file in `commit` to its same-name counterpart in `parent`
/// (if any) via `FileRevisionData::set_other`, and returns the parent files
/// that have no counterpart in `commit`.
///
/// If the two commits' Bloom filters are disjoint, no file name can appear
/// in both lists, so the merge-join is skipped entirely and every parent
/// file is reported removed.
pub fn compute_parent_links(commit: &Commit, parent: &Commit) -> ParentLinks {
    for file in commit.iter_files() {
        file.clear_other();
    }

    if commit.bloom.is_disjoint(&parent.bloom) {
        return ParentLinks {
            removed: parent.iter_files().cloned().collect(),
        };
    }

    let child: Vec<&FileRevision> = commit.iter_files().collect();
    let parent_files: Vec<&FileRevision> = parent.iter_files().collect();

    let mut removed = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < child.len() && j < parent_files.len() {
        let (c, p) = (&child[i], &parent_files[j]);
        match c.name.as_bytes().cmp(p.name.as_bytes()) {
            std::cmp::Ordering::Less => {
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                removed.push((*p).clone());
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                c.set_other(Some(p));
                i += 1;
                j += 1;
            }
        }
    }
    removed.extend(parent_files[j..].iter().map(|f| (*f).clone()));

    ParentLinks { removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bloom::bloom_for_names;
    use crate::model::Directory;
    use crate::model::FileRevisionData;
    use crate::model::RevisionNumber;

    fn file(name: &str, rev: &[u32]) -> FileRevision {
        FileRevisionData::new(Atom::new(name), RevisionNumber::new(rev.to_vec()), false)
    }

    fn commit_with(files: Vec<FileRevision>) -> std::rc::Rc<Commit> {
        let bloom = bloom_for_names(files.iter().map(|f| f.name.as_bytes()));
        Commit::new(
            Atom::new("ada"),
            "log".into(),
            0,
            None,
            false,
            vec![Directory::new(files)],
            bloom,
        )
    }

    #[test]
    fn matches_same_name_files_and_sets_other() {
        let a1 = file("a.c", &[1, 1]);
        let b1 = file("b.c", &[1, 1]);
        let parent = commit_with(vec![a1.clone(), b1.clone()]);

        let a2 = file("a.c", &[1, 2]);
        let commit = commit_with(vec![a2.clone()]);

        let links = compute_parent_links(&commit, &parent);
        assert!(a2.other().is_some());
        assert_eq!(links.removed.len(), 1, "b.c has no counterpart in commit");
    }

    #[test]
    fn disjoint_bloom_reports_all_parent_files_removed() {
        let parent = commit_with(vec![file("x.c", &[1, 1])]);
        let commit = commit_with(vec![file("y.c", &[1, 1])]);
        let links = compute_parent_links(&commit, &parent);
        assert_eq!(links.removed.len(), 1);
    }

    #[test]
    fn new_file_in_commit_has_no_other() {
        let parent = commit_with(vec![file("a.c", &[1, 1])]);
        let a = file("a.c", &[1, 1]);
        let new = file("new.c", &[1, 1]);
        let commit = commit_with(vec![a, new.clone()]);
        compute_parent_links(&commit, &parent);
        assert!(new.other().is_none());
    }
}

//! C5: fileop generation and ordering (§4.5, §6).
//!
//! Turns a commit's file list plus its `ParentLinks` into the `M`/`D`
//! fileop records git-fast-import expects, applying the `Attic`/`RCS`/`,v`
//! path rewrite (§6, P7) and sorting the result with the deep-lexicographic
//! comparator (P3) so `/` always sorts before any other byte — this keeps a
//! directory's own entries adjacent to its subdirectories' entries the way
//! git's own tree ordering does, which is what `original_source/export.c`'s
//! `fileop_sort`/`path_deep_compare` pair exists for.

use crate::fileiter::ParentLinks;
use crate::mark::Mark;
use crate::model::Commit;
use crate::model::FileRevisionData;
use crate::model::RevisionNumber;
use crate::pathrewrite::rewrite_path;
use bstr::BString;
use bstr::ByteSlice as _;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOp {
    Modify {
        path: BString,
        executable: bool,
        mark: Mark,
    },
    /// A fileop whose bytes are embedded directly in the stream rather than
    /// referencing a `blob` mark. Used only for the synthetic default-ignores
    /// `.gitignore` (§6), which has no CVS file revision behind it.
    ModifyInline {
        path: BString,
        data: Vec<u8>,
    },
    Delete {
        path: BString,
    },
}

impl FileOp {
    /// The path this fileop sorts by (P3).
    pub fn path(&self) -> &BString {
        match self {
            FileOp::Modify { path, .. } => path,
            FileOp::ModifyInline { path, .. } => path,
            FileOp::Delete { path } => path,
        }
    }
}

/// True if `file` must produce an `M` fileop against its parent commit: it is
/// new, or its serial differs from the parent's copy's — serial, not
/// revision number, is what identifies a (re)written blob (§4.5).
fn file_needs_modify(file: &FileRevisionData) -> bool {
    match file.other() {
        None => true,
        Some(prev) => prev.serial() != file.serial(),
    }
}

/// Builds the fileops for `commit` given the result of linking it against
/// its parent, resolving each surviving file's blob mark via `mark_of`.
/// `mark_of` is expected to fail only if P1 has been violated upstream, so
/// callers should treat its error as fatal, not a missing-record warning.
pub fn build_fileops(
    commit: &Commit,
    links: &ParentLinks,
    mark_of: impl Fn(crate::mark::Serial) -> Result<Mark, crate::error::ExportError>,
) -> Result<Vec<FileOp>, crate::error::ExportError> {
    let mut ops = Vec::new();

    for file in commit.iter_files() {
        if file_needs_modify(file) {
            let path = rewrite_path(file.name.as_bstr());
            let serial = file
                .serial()
                .expect("file revision must have a serial before fileops are built");
            ops.push(FileOp::Modify {
                path,
                executable: file.executable,
                mark: mark_of(serial)?,
            });
        }
    }

    for removed in &links.removed {
        ops.push(FileOp::Delete {
            path: rewrite_path(removed.name.as_bstr()),
        });
    }

    ops.sort_by(|a, b| path_deep_compare(a.path(), b.path()));
    Ok(ops)
}

/// The rewritten path and revision number of every file this commit
/// modifies, in the same set `build_fileops` would emit `M` ops for. Shared
/// by the embed-ids, revision-map and reposurgeon trailers (§4.6), which all
/// iterate this same list.
pub fn modified_files(commit: &Commit) -> Vec<(BString, RevisionNumber)> {
    commit
        .iter_files()
        .filter(|file| file_needs_modify(file))
        .map(|file| (rewrite_path(file.name.as_bstr()), file.revision.clone()))
        .collect()
}

/// Compares two paths such that `/` sorts before every other byte, so that
/// e.g. `"a/b"` sorts before `"a-1"` even though `-` (0x2D) is less than `/`
/// (0x2F) in plain byte order. A byte that is absent (shorter path) sorts as
/// if it were `/`, matching `original_source/export.c`'s `path_deep_compare`.
pub fn path_deep_compare(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    fn key(byte: u8) -> u16 {
        if byte == b'/' {
            0
        } else {
            byte as u16 + 1
        }
    }
    let mut ai = a.iter().copied();
    let mut bi = b.iter().copied();
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return std::cmp::Ordering::Equal,
            (None, Some(_)) => return std::cmp::Ordering::Less,
            (Some(_), None) => return std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = key(x).cmp(&key(y));
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bloom::bloom_for_names;
    use crate::mark::MarkAllocator;
    use crate::model::Directory;
    use crate::model::FileRevisionData;
    use crate::model::RevisionNumber;

    #[test]
    fn slash_sorts_before_other_bytes() {
        assert_eq!(
            path_deep_compare(b"a/b", b"a-1"),
            std::cmp::Ordering::Less,
            "a/b must come before a-1 even though '-' < '/' in plain byte order"
        );
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        assert_eq!(path_deep_compare(b"a", b"a/b"), std::cmp::Ordering::Less);
    }

    #[test]
    fn builds_modify_for_new_file_and_delete_for_removed() {
        let mut alloc = MarkAllocator::new();

        let removed_file = FileRevisionData::new(
            Atom::new("old/Attic/gone.c,v"),
            RevisionNumber::new(vec![1, 1]),
            false,
        );
        let new_file = FileRevisionData::new(
            Atom::new("new.c,v"),
            RevisionNumber::new(vec![1, 1]),
            false,
        );
        let serial = alloc.next_serial().unwrap();
        new_file.assign_serial(serial);
        let mark = alloc.assign_mark(serial).unwrap();

        let bloom = bloom_for_names([new_file.name.as_bytes()]);
        let commit = Commit::new(
            Atom::new("ada"),
            "log".into(),
            0,
            None,
            false,
            vec![Directory::new(vec![new_file])],
            bloom,
        );

        let links = ParentLinks {
            removed: vec![removed_file],
        };

        let ops = build_fileops(&commit, &links, |s| {
            assert_eq!(s, serial);
            Ok(mark)
        })
        .unwrap();

        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], FileOp::Delete { path } if path.as_slice() == b"old/gone.c"));
        assert!(matches!(&ops[1], FileOp::Modify { path, .. } if path.as_slice() == b"new.c"));
    }

    #[test]
    fn unchanged_file_produces_no_fileop() {
        let mut alloc = MarkAllocator::new();
        let serial = alloc.next_serial().unwrap();

        let prev = FileRevisionData::new(
            Atom::new("same.c,v"),
            RevisionNumber::new(vec![1, 1]),
            false,
        );
        prev.assign_serial(serial);
        let cur = FileRevisionData::new(
            Atom::new("same.c,v"),
            RevisionNumber::new(vec![1, 1]),
            false,
        );
        cur.assign_serial(serial);
        cur.set_other(Some(&prev));

        let bloom = bloom_for_names([cur.name.as_bytes()]);
        let commit = Commit::new(
            Atom::new("ada"),
            "log".into(),
            0,
            None,
            false,
            vec![Directory::new(vec![cur])],
            bloom,
        );
        let links = ParentLinks { removed: vec![] };
        let ops = build_fileops(&commit, &links, |_| {
            panic!("unchanged file must not resolve a mark")
        })
        .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn differing_serial_forces_modify_even_with_same_revision_number() {
        let mut alloc = MarkAllocator::new();
        let prev_serial = alloc.next_serial().unwrap();
        let cur_serial = alloc.next_serial().unwrap();
        let mark = alloc.assign_mark(cur_serial).unwrap();

        let prev = FileRevisionData::new(
            Atom::new("same.c,v"),
            RevisionNumber::new(vec![1, 1]),
            false,
        );
        prev.assign_serial(prev_serial);
        let cur = FileRevisionData::new(
            Atom::new("same.c,v"),
            RevisionNumber::new(vec![1, 1]),
            false,
        );
        cur.assign_serial(cur_serial);
        cur.set_other(Some(&prev));

        let bloom = bloom_for_names([cur.name.as_bytes()]);
        let commit = Commit::new(
            Atom::new("ada"),
            "log".into(),
            0,
            None,
            false,
            vec![Directory::new(vec![cur])],
            bloom,
        );
        let links = ParentLinks { removed: vec![] };
        let ops = build_fileops(&commit, &links, |s| {
            assert_eq!(s, cur_serial);
            Ok(mark)
        })
        .unwrap();
        assert_eq!(ops.len(), 1);
    }
}

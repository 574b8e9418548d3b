//! C6: commit and blob emission to a git-fast-import stream.
//!
//! Grounded on `original_source/export.c`'s `export_blob`/`export_commit`
//! and on `examples/meroton-git-toprepo/src/git_fast_export_import.rs`'s
//! `write_commit`, which establishes the pattern of writing one record at a
//! time straight to a `Write` sink rather than building an intermediate
//! buffer. Every write goes through `ExportError::Output` so an I/O failure
//! anywhere in a record aborts the run instead of leaving a half-written
//! stream.

use crate::error::ExportError;
use crate::fileops::FileOp;
use crate::mark::Mark;
use crate::pathrewrite::is_gitignore_path;
use crate::pathrewrite::CVS_IGNORES;
use crate::timestamp::format_timestamp;
use bstr::BString;
use bstr::ByteSlice as _;
use std::io::Write;

/// Writes one `blob` record: mark declaration, `data` header, raw bytes.
/// Marks must be assigned strictly before use (P1), but a blob's own mark is
/// defined right here, so there is nothing to check beyond handing it back
/// for the fileop that will reference it later.
pub fn emit_blob<W: Write>(out: &mut W, mark: Mark, contents: &[u8]) -> Result<(), ExportError> {
    writeln!(out, "blob").map_err(ExportError::Output)?;
    writeln!(out, "mark :{mark}").map_err(ExportError::Output)?;
    writeln!(out, "data {}", contents.len()).map_err(ExportError::Output)?;
    out.write_all(contents).map_err(ExportError::Output)?;
    writeln!(out).map_err(ExportError::Output)?;
    Ok(())
}

/// Builds the synthetic `.gitignore` fileop carrying the CVS default-ignores
/// block (§6). Unlike a real file revision, this has no backing CVS master,
/// so its bytes are embedded inline in the fileop rather than referencing a
/// `blob` mark.
pub fn default_ignores_fileop() -> FileOp {
    FileOp::ModifyInline {
        path: BString::from(".gitignore"),
        data: CVS_IGNORES.as_bytes().to_vec(),
    }
}

pub struct CommitHeader<'a> {
    pub ref_name: &'a str,
    pub mark: Mark,
    pub author: &'a str,
    pub timezone: &'a str,
    pub epoch_seconds: i64,
    pub log: &'a BString,
    pub from: Option<Mark>,
    /// Incremental-dump boundary marker (§4.8): printed as `from <ref>^0`
    /// instead of `from :<mark>` when the parent commit was suppressed by
    /// `fromtime` and so never received a mark of its own. Mutually
    /// exclusive with `from`.
    pub from_boundary: Option<&'a str>,
    /// `CVS-ID: <path> <revision>` lines (one per modified file), appended
    /// to the log text after a blank line when `embed_ids` is enabled
    /// (§4.6/§6).
    pub embed_ids_trailer: Option<&'a str>,
    /// `property cvs-revision <len> <revision-pairs>` trailer line, printed
    /// after the fileops, when `reposurgeon` is enabled (§4.6/§6).
    pub reposurgeon_property: Option<&'a str>,
}

/// Writes one `commit` record: header, optional `from`, fileops, blank line.
pub fn emit_commit<W: Write>(
    out: &mut W,
    header: &CommitHeader<'_>,
    fileops: &[FileOp],
) -> Result<(), ExportError> {
    writeln!(out, "commit {}", header.ref_name).map_err(ExportError::Output)?;
    writeln!(out, "mark :{}", header.mark).map_err(ExportError::Output)?;
    let date = format_timestamp(header.epoch_seconds, header.timezone)?;
    writeln!(out, "committer {} <{}> {date}", header.author, header.author)
        .map_err(ExportError::Output)?;

    let mut body = header.log.to_vec();
    if let Some(trailer) = header.embed_ids_trailer {
        body.extend_from_slice(b"\n\n");
        body.extend_from_slice(trailer.as_bytes());
    }
    writeln!(out, "data {}", body.len()).map_err(ExportError::Output)?;
    out.write_all(&body).map_err(ExportError::Output)?;
    writeln!(out).map_err(ExportError::Output)?;

    if let Some(from) = header.from {
        writeln!(out, "from :{from}").map_err(ExportError::Output)?;
    } else if let Some(ref_name) = header.from_boundary {
        writeln!(out, "from {ref_name}^0").map_err(ExportError::Output)?;
    }

    for op in fileops {
        match op {
            FileOp::Modify {
                path,
                executable,
                mark,
            } => {
                let mode = if *executable { "100755" } else { "100644" };
                writeln!(out, "M {mode} :{mark} {path}").map_err(ExportError::Output)?;
            }
            FileOp::ModifyInline { path, data } => {
                writeln!(out, "M 100644 inline {path}").map_err(ExportError::Output)?;
                writeln!(out, "data {}", data.len()).map_err(ExportError::Output)?;
                out.write_all(data).map_err(ExportError::Output)?;
                writeln!(out).map_err(ExportError::Output)?;
            }
            FileOp::Delete { path } => {
                writeln!(out, "D {path}").map_err(ExportError::Output)?;
            }
        }
    }

    if let Some(property) = header.reposurgeon_property {
        writeln!(out, "property cvs-revision {} {property}", property.len())
            .map_err(ExportError::Output)?;
    }

    writeln!(out).map_err(ExportError::Output)?;
    Ok(())
}

/// Returns `true` if `fileops` itself introduces a `.gitignore`, i.e. the
/// synthetic default-ignores fileop would be redundant on this commit.
pub fn fileops_define_gitignore(fileops: &[FileOp]) -> bool {
    fileops.iter().any(|op| match op {
        FileOp::Modify { path, .. } => is_gitignore_path(path.as_bstr()),
        FileOp::ModifyInline { path, .. } => is_gitignore_path(path.as_bstr()),
        FileOp::Delete { .. } => false,
    })
}

/// Writes a `reset` record pointing a ref at the given commit mark. Used for
/// branch tips and, per §6, for tags — cvs-fast-export emits tags as
/// lightweight refs under `refs/tags/`, not annotated tag objects.
pub fn emit_reset<W: Write>(out: &mut W, ref_name: &str, mark: Mark) -> Result<(), ExportError> {
    writeln!(out, "reset {ref_name}").map_err(ExportError::Output)?;
    writeln!(out, "from :{mark}").map_err(ExportError::Output)?;
    writeln!(out).map_err(ExportError::Output)?;
    Ok(())
}

/// Writes the stream's terminating `done` marker (§6).
pub fn emit_done<W: Write>(out: &mut W) -> Result<(), ExportError> {
    writeln!(out, "done").map_err(ExportError::Output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::MarkAllocator;

    fn mark(n: u64) -> Mark {
        let mut alloc = MarkAllocator::new();
        let mut last = alloc.next_mark().unwrap();
        for _ in 1..n {
            last = alloc.next_mark().unwrap();
        }
        last
    }

    #[test]
    fn blob_record_has_exact_byte_length_header() {
        let mut buf = Vec::new();
        emit_blob(&mut buf, mark(1), b"hi").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "blob\nmark :1\ndata 2\nhi\n");
    }

    #[test]
    fn commit_record_includes_from_and_fileops_in_order() {
        let mut buf = Vec::new();
        let fileops = vec![
            FileOp::Delete {
                path: "old.c".into(),
            },
            FileOp::Modify {
                path: "new.c".into(),
                executable: true,
                mark: mark(2),
            },
        ];
        let header = CommitHeader {
            ref_name: "refs/heads/master",
            mark: mark(3),
            author: "ada",
            timezone: "",
            epoch_seconds: 1,
            log: &BString::from("msg"),
            from: Some(mark(1)),
            from_boundary: None,
            embed_ids_trailer: None,
            reposurgeon_property: None,
        };
        emit_commit(&mut buf, &header, &fileops).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("commit refs/heads/master\nmark :3\n"));
        assert!(text.contains("from :1\n"));
        assert!(text.contains("D old.c\n"));
        assert!(text.contains("M 100755 :2 new.c\n"));
    }

    #[test]
    fn default_ignores_fileop_embeds_bytes_inline() {
        let mut buf = Vec::new();
        let header = CommitHeader {
            ref_name: "refs/heads/master",
            mark: mark(1),
            author: "ada",
            timezone: "",
            epoch_seconds: 1,
            log: &BString::from("root"),
            from: None,
            from_boundary: None,
            embed_ids_trailer: None,
            reposurgeon_property: None,
        };
        emit_commit(&mut buf, &header, &[default_ignores_fileop()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("M 100644 inline .gitignore\n"));
        assert!(text.contains("CVS default ignores begin"));
    }

    #[test]
    fn embed_ids_trailer_is_appended_after_a_blank_line() {
        let mut buf = Vec::new();
        let header = CommitHeader {
            ref_name: "refs/heads/master",
            mark: mark(1),
            author: "ada",
            timezone: "",
            epoch_seconds: 1,
            log: &BString::from("msg"),
            from: None,
            from_boundary: None,
            embed_ids_trailer: Some("CVS-ID: a.c 1.1\n"),
            reposurgeon_property: None,
        };
        emit_commit(&mut buf, &header, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("data 21\nmsg\n\nCVS-ID: a.c 1.1\n"));
    }

    #[test]
    fn reposurgeon_property_line_follows_fileops() {
        let mut buf = Vec::new();
        let header = CommitHeader {
            ref_name: "refs/heads/master",
            mark: mark(1),
            author: "ada",
            timezone: "",
            epoch_seconds: 1,
            log: &BString::from("msg"),
            from: None,
            from_boundary: None,
            embed_ids_trailer: None,
            reposurgeon_property: Some("a.c 1.1\n"),
        };
        emit_commit(&mut buf, &header, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("property cvs-revision 8 a.c 1.1\n"));
    }

    #[test]
    fn from_boundary_prints_ref_caret_zero() {
        let mut buf = Vec::new();
        let header = CommitHeader {
            ref_name: "refs/heads/master",
            mark: mark(1),
            author: "ada",
            timezone: "",
            epoch_seconds: 1,
            log: &BString::from("msg"),
            from: None,
            from_boundary: Some("refs/heads/master"),
            embed_ids_trailer: None,
            reposurgeon_property: None,
        };
        emit_commit(&mut buf, &header, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("from refs/heads/master^0\n"));
    }

    #[test]
    fn fileops_define_gitignore_detects_direct_modify() {
        let ops = vec![FileOp::Modify {
            path: ".gitignore".into(),
            executable: false,
            mark: mark(1),
        }];
        assert!(fileops_define_gitignore(&ops));
    }

    #[test]
    fn reset_record_has_blank_line_terminator() {
        let mut buf = Vec::new();
        emit_reset(&mut buf, "refs/tags/v1", mark(1)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "reset refs/tags/v1\nfrom :1\n\n");
    }
}

//! §6 path rewriting and the CVS default-ignores block.

use bstr::BStr;
use bstr::BString;
use bstr::ByteSlice as _;

/// The block cvs-fast-export prepends to every emitted `.gitignore` and
/// synthesizes as a standalone fileop once per run (§6, "Default ignores").
/// Kept byte-for-byte identical to `original_source/export.c`'s `CVS_IGNORES`
/// since downstream tooling compares output token-for-token.
pub const CVS_IGNORES: &str = "\
# CVS default ignores begin
tags
TAGS
.make.state
.nse_depinfo
*~
#*
.#*
,*
_$*
*$
*.old
*.bak
*.BAK
*.orig
*.rej
.del-*
*.a
*.olb
*.o
*.obj
*.so
*.exe
*.Z
*.elc
*.ln
core
# CVS default ignores end
";

/// Rewrites a repository-relative, `,v`-suffixed CVS master path into the
/// path that should appear in fileops: `Attic/` and `RCS/` path components
/// are elided, the trailing `,v` is stripped, and a `.cvsignore` basename
/// becomes `.gitignore` (P7).
pub fn rewrite_path(path: &BStr) -> BString {
    let path = path.strip_suffix(b",v").map(BStr::new).unwrap_or(path);

    let kept: Vec<&[u8]> = path
        .split_str(b"/")
        .filter(|component| *component != b"Attic" && *component != b"RCS")
        .collect();
    let mut out = BString::new(kept.join(&b"/"[..]));

    if let Some(prefix) = out.rfind_byte(b'/').map(|i| i + 1) {
        if &out[prefix..] == b".cvsignore" {
            out.truncate(prefix);
            out.extend_from_slice(b".gitignore");
        }
    } else if out.as_slice() == b".cvsignore" {
        out = BString::from(".gitignore");
    }

    out
}

/// True if the rewritten path is `.gitignore` (possibly nested).
pub fn is_gitignore_path(path: &BStr) -> bool {
    path.rfind_byte(b'/')
        .map(|i| &path[i + 1..] == b".gitignore")
        .unwrap_or(path.as_bytes() == b".gitignore")
}

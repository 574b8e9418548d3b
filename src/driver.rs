//! C8: the export driver — ties the mark allocator, blob store, fileop
//! builder and emitter together into the two export modes §5 describes.
//!
//! "Fast" mode streams each branch independently, in parent-before-child
//! order, writing blobs inline as each commit is visited (`export_commit`'s
//! single-pass behavior in `original_source/export.c`). "Canonical" mode
//! first walks every reachable commit across every branch to build one
//! globally date-sorted sequence (`compare_commit`, `canonicalize.rs`),
//! stages every not-yet-emitted blob through a `BlobStore`, then replays the
//! blobs and commits in that order — the shape `export_ncommit` uses to
//! keep output byte-identical across runs regardless of branch traversal
//! order.

use crate::blobstore::BlobStore;
use crate::canonicalize::check_topological_order;
use crate::canonicalize::compare_commit;
use crate::emitter::default_ignores_fileop;
use crate::emitter::emit_blob;
use crate::emitter::emit_commit;
use crate::emitter::emit_done;
use crate::emitter::emit_reset;
use crate::emitter::fileops_define_gitignore;
use crate::emitter::CommitHeader;
use crate::error::ExportError;
use crate::fileiter::compute_parent_links;
use crate::fileops::build_fileops;
use crate::fileops::modified_files;
use crate::mark::Mark;
use crate::mark::MarkAllocator;
use crate::mark::Serial;
use crate::model::BranchHead;
use crate::model::Commit;
use crate::model::Tag;
use crate::progress::NullProgress;
use crate::progress::ProgressSink;
use crate::stats::ExportStats;
use crate::timestamp::display_date;
use bstr::BString;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

pub struct ExportInput {
    pub branches: Vec<BranchHead>,
    pub tags: Vec<Tag>,
    pub timezone: String,
}

/// The §6 options that shape how a run's commit records look, independent
/// of which of the two modes (§5) produces them.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub timezone: String,
    pub branch_prefix: String,
    pub force_dates: bool,
    pub commit_time_window: i64,
    pub reposurgeon: bool,
    pub embed_ids: bool,
    pub revision_map: Option<PathBuf>,
    pub fromtime: i64,
    pub compress_blobs: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            timezone: String::new(),
            branch_prefix: String::new(),
            force_dates: false,
            commit_time_window: 300,
            reposurgeon: false,
            embed_ids: false,
            revision_map: None,
            fromtime: 0,
            compress_blobs: false,
        }
    }
}

pub struct Driver<W: Write> {
    out: W,
    marks: MarkAllocator,
    stats: ExportStats,
    progress: Box<dyn ProgressSink>,
    /// Set once the first commit of the run has contributed the synthetic
    /// default-ignores fileop (§4.6's `need_ignores` flag), so no later
    /// root commit re-embeds the same bytes.
    ignores_emitted: bool,
    options: DriverOptions,
    /// commit mark keyed by its serial, so later phases (tags, resets) can
    /// resolve a commit to the mark its commit record was written under.
    /// Absent for a commit an incremental (`fromtime`) run suppressed.
    commit_marks: HashMap<Serial, Mark>,
    /// Only populated in canonical mode (§4.8's two-pass blob phase); `None`
    /// means blobs are emitted inline as each commit is visited (fast mode).
    blob_store: Option<BlobStore>,
    revision_map: Option<BufWriter<std::fs::File>>,
}

impl<W: Write> Driver<W> {
    pub fn new(out: W, options: DriverOptions) -> Result<Self, ExportError> {
        let revision_map = match &options.revision_map {
            Some(path) => Some(BufWriter::new(std::fs::File::create(path).map_err(
                |source| ExportError::RevisionMapOpen {
                    path: path.clone(),
                    source,
                },
            )?)),
            None => None,
        };
        Ok(Driver {
            out,
            marks: MarkAllocator::new(),
            stats: ExportStats::new(),
            progress: Box::new(NullProgress),
            ignores_emitted: false,
            options,
            commit_marks: HashMap::new(),
            blob_store: None,
            revision_map,
        })
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Prefixes `ref_name` with `branch_prefix` unless it is already rooted
    /// under `refs/` (§6: `branch_prefix` only applies to bare names).
    fn qualify_branch_ref(&self, ref_name: &str) -> String {
        if ref_name.starts_with("refs/") || self.options.branch_prefix.is_empty() {
            ref_name.to_string()
        } else {
            format!("{}{}", self.options.branch_prefix, ref_name)
        }
    }

    /// Stages and emits any file revisions referenced by `commit` that have
    /// not already been assigned a serial/mark, assigning both as it goes.
    fn emit_new_blobs(&mut self, commit: &Commit) -> Result<(), ExportError> {
        for file in commit.iter_files() {
            if file.is_emitted() {
                continue;
            }
            let serial = self.marks.next_serial()?;
            file.assign_serial(serial);
            // The actual byte contents of a file revision are supplied by
            // the (external, out-of-scope) CVS RCS-file reader; here we only
            // know that this revision's bytes must appear exactly once.
            match &self.blob_store {
                Some(store) => {
                    store.write_blob(serial, &[])?;
                    let mark = self.marks.assign_mark(serial)?;
                    let contents = store.read_blob(serial)?;
                    emit_blob(&mut self.out, mark, &contents)?;
                    store.unlink_blob(serial)?;
                }
                None => {
                    let mark = self.marks.assign_mark(serial)?;
                    emit_blob(&mut self.out, mark, &[])?;
                }
            }
            self.stats.record_blob();
            file.mark_emitted();
            self.progress.inc(1);
        }
        Ok(())
    }

    fn mark_for_serial(&self, serial: Serial) -> Result<Mark, ExportError> {
        self.marks.require(serial)
    }

    /// Builds the revpairs text shared by `embed_ids`, `revision_map` and
    /// `reposurgeon` (§4.6): one `<path> <revision>` line per modified file,
    /// `CVS-ID: `-prefixed when `embed_ids` is on.
    fn revpairs(&self, commit: &Commit) -> Vec<(BString, String)> {
        modified_files(commit)
            .into_iter()
            .map(|(path, revision)| {
                let line = if self.options.embed_ids {
                    format!("CVS-ID: {path} {revision}\n")
                } else {
                    format!("{path} {revision}\n")
                };
                (path, line)
            })
            .collect()
    }

    fn write_revision_map(&mut self, pairs: &[(BString, String)], mark: Mark) -> Result<(), ExportError> {
        if self.revision_map.is_none() {
            return Ok(());
        }
        let sink = self.revision_map.as_mut().unwrap();
        for (_, line) in pairs {
            let line = line.trim_end_matches('\n');
            writeln!(sink, "{line} :{mark}").map_err(ExportError::RevisionMapWrite)?;
        }
        Ok(())
    }

    /// Emits one commit: its new blobs, its fileops against `parent`, then
    /// the commit record itself. `parent` is `None` for the oldest commit on
    /// a branch that introduces fresh history (as opposed to a merge base
    /// shared with an already-visited branch). Returns `None` if `fromtime`
    /// suppressed this commit (§4.8): it still gets a serial, but no mark
    /// and no record, so later commits fall back to a `^0` boundary marker
    /// instead of referencing it.
    fn emit_one_commit(
        &mut self,
        ref_name: &str,
        commit: &Rc<Commit>,
        parent: Option<&Rc<Commit>>,
    ) -> Result<Option<Mark>, ExportError> {
        let serial = commit
            .serial()
            .expect("commit must have a serial assigned before it is emitted");

        if self.options.fromtime > 0 {
            let predicted_mark = self.marks.mark_count() + 1;
            let date = display_date(
                commit.date,
                predicted_mark,
                self.options.force_dates,
                self.options.commit_time_window,
            );
            if date <= self.options.fromtime {
                return Ok(None);
            }
        }

        self.emit_new_blobs(commit)?;

        let links = match parent {
            Some(parent) => compute_parent_links(commit, parent),
            None => crate::fileiter::ParentLinks {
                removed: Vec::new(),
            },
        };
        let mut fileops = build_fileops(commit, &links, |s| self.mark_for_serial(s))?;

        if !self.ignores_emitted && !fileops_define_gitignore(&fileops) {
            fileops.push(default_ignores_fileop());
            fileops.sort_by(|a, b| crate::fileops::path_deep_compare(a.path(), b.path()));
            self.ignores_emitted = true;
        }

        let mark = self.marks.assign_mark(serial)?;

        let (from, from_boundary) = match parent {
            None => (None, None),
            Some(p) => match p.serial().and_then(|s| self.commit_marks.get(&s).copied()) {
                Some(m) => (Some(m), None),
                None => (None, Some(ref_name)),
            },
        };

        let epoch_seconds = display_date(
            commit.date,
            mark.get(),
            self.options.force_dates,
            self.options.commit_time_window,
        );

        let pairs = self.revpairs(commit);
        let trailer_text: String = pairs.iter().map(|(_, line)| line.as_str()).collect();
        let embed_ids_trailer =
            (self.options.embed_ids && !trailer_text.is_empty()).then_some(trailer_text.as_str());
        let reposurgeon_property =
            (self.options.reposurgeon && !trailer_text.is_empty()).then_some(trailer_text.as_str());

        let author = commit.author.to_string();
        let qualified_ref = self.qualify_branch_ref(ref_name);
        let header = CommitHeader {
            ref_name: &qualified_ref,
            mark,
            author: &author,
            timezone: &self.options.timezone,
            epoch_seconds,
            log: &commit.log,
            from,
            from_boundary,
            embed_ids_trailer,
            reposurgeon_property,
        };
        emit_commit(&mut self.out, &header, &fileops)?;
        self.stats.record_commit(fileops.len());
        self.commit_marks.insert(serial, mark);
        self.write_revision_map(&pairs, mark)?;
        self.progress.inc(1);
        Ok(Some(mark))
    }

    fn mark_for_commit(&self, commit: &Rc<Commit>) -> Option<Mark> {
        let serial = commit.serial()?;
        self.commit_marks.get(&serial).copied()
    }

    /// `true` if `commit`'s own display date passes the incremental
    /// threshold (§4.8). Always true when `fromtime` is unset.
    fn passes_fromtime(&self, commit: &Commit, mark: Mark) -> bool {
        let date = display_date(
            commit.date,
            mark.get(),
            self.options.force_dates,
            self.options.commit_time_window,
        );
        date > self.options.fromtime
    }

    /// Fast mode (§5): each branch is replayed independently, oldest commit
    /// first, with no cross-branch deduplication of shared ancestor commits.
    /// `fromtime` always forces canonical mode (§4.8), so this path never
    /// has to suppress a commit.
    pub fn run_fast(&mut self, input: &ExportInput) -> Result<(), ExportError> {
        for branch in &input.branches {
            if branch.tail {
                continue;
            }
            let commits = oldest_first(branch);
            self.progress
                .start_phase(&branch.ref_name.to_string(), commits.len() as u64);
            for (i, commit) in commits.iter().enumerate() {
                if commit.serial().is_none() {
                    commit.assign_serial(self.marks.next_serial()?);
                }
                let parent = if i == 0 { None } else { Some(&commits[i - 1]) };
                self.emit_one_commit(&branch.ref_name.to_string(), commit, parent)?;
            }
            self.progress.finish_phase();
            self.emit_branch_reset(branch)?;
        }
        self.emit_tags(&input.tags)?;
        emit_done(&mut self.out)?;
        Ok(())
    }

    /// Canonical mode (§5): every reachable commit, across every branch, is
    /// visited once in a single global date-sorted order, so a commit shared
    /// by two branches (a common ancestor) is emitted exactly once. Each
    /// commit keeps the ref of the earliest-declared branch that reaches it,
    /// matching `original_source/export.c`'s `hp->head->ref_name`.
    pub fn run_canonical(&mut self, input: &ExportInput) -> Result<(), ExportError> {
        self.blob_store
            .get_or_insert(BlobStore::new(self.options.compress_blobs)?);

        let mut all = dedup_commits(&input.branches);
        all.sort_by(|(a, _), (b, _)| compare_commit(a, b));
        let commit_refs: Vec<Rc<Commit>> = all.iter().map(|(c, _)| c.clone()).collect();
        let violations = check_topological_order(&commit_refs);
        if !violations.is_empty() {
            self.stats.record_out_of_order(violations.len());
        }

        self.progress.start_phase("commits", all.len() as u64);
        for (commit, _) in &all {
            commit.assign_serial(self.marks.next_serial()?);
        }
        for (commit, ref_name) in &all {
            let parent = commit.parent.clone();
            self.emit_one_commit(&ref_name.to_string(), commit, parent.as_ref())?;
        }
        self.progress.finish_phase();

        for branch in &input.branches {
            self.emit_branch_reset(branch)?;
        }
        self.emit_tags(&input.tags)?;
        emit_done(&mut self.out)?;
        Ok(())
    }

    /// Writes the final `reset <ref>\nfrom :<M>\n\n` for one branch head, if
    /// its tip passes the incremental threshold and actually received a mark
    /// (a `fromtime` run may have suppressed it entirely).
    fn emit_branch_reset(&mut self, branch: &BranchHead) -> Result<(), ExportError> {
        let Some(mark) = self.mark_for_commit(&branch.commit) else {
            return Ok(());
        };
        if !self.passes_fromtime(&branch.commit, mark) {
            return Ok(());
        }
        let ref_name = self.qualify_branch_ref(&branch.ref_name.to_string());
        emit_reset(&mut self.out, &ref_name, mark)?;
        self.stats.record_branch();
        Ok(())
    }

    /// Writes a lightweight `refs/tags/<name>` reset for each tag (§6: tags
    /// are plain ref resets, not annotated tag objects), skipping any tag
    /// whose target commit an incremental run suppressed or which doesn't
    /// yet pass the threshold.
    fn emit_tags(&mut self, tags: &[Tag]) -> Result<(), ExportError> {
        for tag in tags {
            let Some(mark) = self.mark_for_commit(&tag.commit) else {
                continue;
            };
            if !self.passes_fromtime(&tag.commit, mark) {
                continue;
            }
            let ref_name = tag.name.to_string();
            let ref_name = if ref_name.starts_with("refs/") {
                ref_name
            } else {
                format!("refs/tags/{ref_name}")
            };
            emit_reset(&mut self.out, &ref_name, mark)?;
            self.stats.record_tag();
        }
        Ok(())
    }

    pub fn into_stats(self) -> ExportStats {
        self.stats
    }
}

fn oldest_first(branch: &BranchHead) -> Vec<Rc<Commit>> {
    let mut commits = branch.commits_newest_first();
    commits.reverse();
    commits
}

/// Collects every commit reachable from any branch head, deduplicated by
/// `Rc` identity so a commit shared by two branches is kept once, paired
/// with the ref name of the first (declaration-order) branch that reaches
/// it.
fn dedup_commits(branches: &[BranchHead]) -> Vec<(Rc<Commit>, BString)> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for branch in branches {
        if branch.tail {
            continue;
        }
        for commit in oldest_first(branch) {
            if seen.insert(Rc::as_ptr(&commit)) {
                out.push((commit, branch.ref_name.clone()));
            }
        }
    }
    out
}

/// Supplemented feature (§9.8): lists the distinct CVS author names referenced
/// by the given history, deduplicated in first-occurrence order (oldest
/// commit first, branches walked in declaration order) rather than sorted,
/// matching `original_source/export.c`'s `export_authors`.
pub fn list_authors(branches: &[BranchHead]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut authors = Vec::new();
    for (commit, _) in dedup_commits(branches) {
        let name = commit.author.to_string();
        if seen.insert(name.clone()) {
            authors.push(name);
        }
    }
    authors
}

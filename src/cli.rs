//! Command line argument definitions (§9.4 ambient stack).

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

const ABOUT: &str = "Exports a CVS-style commit history to a git-fast-import stream.";

#[derive(Parser, Debug)]
#[command(about = ABOUT)]
pub struct Cli {
    #[clap(flatten)]
    pub log_level: LogLevelArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct LogLevelArg {
    /// Use `-v` for debug or `-vv` for trace log messages.
    #[arg(long, short = 'v', global = true, default_value = "0", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Use `-q` to hide info, `-qq` to hide warnings too.
    #[arg(long, short = 'q', global = true, default_value = "0", action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a git-fast-import stream for the history described in a scene file.
    Export(ExportArgs),
    /// List the distinct author names referenced by a scene file, one per
    /// line, for seeding an author-map before a real export.
    Authors(AuthorsArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to a JSON scene file describing the commit history to export.
    pub scene: PathBuf,

    /// Optional TOML config file; CLI flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use canonical (global date-sorted, deduplicated) export mode instead
    /// of per-branch fast mode.
    #[arg(long)]
    pub canonical: bool,

    /// Compress staged blobs on disk in canonical mode.
    #[arg(long)]
    pub compress_blobs: bool,

    /// IANA timezone name used to render commit/tag dates. Empty means UTC.
    #[arg(long, default_value = "")]
    pub timezone: String,

    /// Where to write the fast-import stream. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Prepended to a branch ref that isn't already rooted under `refs/`.
    #[arg(long, default_value = "")]
    pub branch_prefix: String,

    /// Synthesize monotonic committer timestamps from marks instead of using
    /// each commit's own CVS date.
    #[arg(long)]
    pub force_dates: bool,

    /// Multiplier used by `--force-dates`'s synthetic timestamp formula.
    #[arg(long)]
    pub commit_time_window: Option<i64>,

    /// Append a `property cvs-revision` trailer to every commit.
    #[arg(long)]
    pub reposurgeon: bool,

    /// Suffix each commit's log with `CVS-ID:` lines, one per modified file.
    #[arg(long)]
    pub embed_ids: bool,

    /// Write `<path> <rev> :<mark>` lines for every modified file to this
    /// path as the export proceeds.
    #[arg(long)]
    pub revision_map: Option<PathBuf>,

    /// Suppress commits, tags and resets at or before this epoch (forces
    /// canonical mode).
    #[arg(long)]
    pub fromtime: Option<i64>,
}

#[derive(Args, Debug)]
pub struct AuthorsArgs {
    /// Path to a JSON scene file describing the commit history to inspect.
    pub scene: PathBuf,
}

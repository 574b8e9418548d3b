//! Export configuration (§6 options, §9.3 ambient stack).
//!
//! Options can be given on the command line or collected into a TOML file
//! for repeatable runs; `serde_path_to_error` is used when loading the file
//! so a malformed field points at its exact location instead of just "data
//! did not match any variant of untagged enum ...".

use crate::error::ExportError;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Output ordering/staging strategy (§6 `reportmode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    Fast,
    Canonical,
    Adaptive,
}

impl Default for ReportMode {
    fn default() -> Self {
        ReportMode::Fast
    }
}

/// Total CVS master text size, in bytes, below which `adaptive` mode picks
/// canonical output over fast (§4.8). Above this the per-branch streaming of
/// fast mode is cheaper than canonicalizing a single global sequence.
const ADAPTIVE_THRESHOLD_BYTES: u64 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output ordering/staging strategy (§6 `reportmode`).
    pub report_mode: ReportMode,

    /// Transparently DEFLATE-compress staged blobs on disk (§4.2). Only
    /// meaningful in canonical mode, which stages blobs before writing them.
    pub compress_blobs: bool,

    /// IANA zone name used to render commit/tag dates (§9.7). Empty means
    /// UTC.
    pub timezone: String,

    /// Where to write the fast-import stream. `None` means stdout.
    pub output: Option<PathBuf>,

    /// Prepended to a branch ref that isn't already rooted under `refs/`.
    pub branch_prefix: String,

    /// Synthesize monotonic committer timestamps from marks instead of using
    /// the commit's own date (§4.6 `display_date`).
    pub force_dates: bool,

    /// Multiplier used by `force_dates`'s synthetic timestamp formula.
    pub commit_time_window: i64,

    /// Append a `property cvs-revision <len> <revision-pairs>` trailer to
    /// every commit, for reposurgeon-flavored downstream processing.
    pub reposurgeon: bool,

    /// Suffix each commit's log with `CVS-ID: <path> <revision>` lines, one
    /// per modified file.
    pub embed_ids: bool,

    /// When set, write `<path> <rev> :<mark>` lines for every modified file
    /// to this path as the export proceeds.
    pub revision_map: Option<PathBuf>,

    /// Incremental lower bound: commits whose display date is at or before
    /// this epoch are suppressed. A positive value forces canonical mode.
    pub fromtime: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            report_mode: ReportMode::default(),
            compress_blobs: false,
            timezone: String::new(),
            output: None,
            branch_prefix: String::new(),
            force_dates: false,
            commit_time_window: 300,
            reposurgeon: false,
            embed_ids: false,
            revision_map: None,
            fromtime: 0,
        }
    }
}

impl ExportConfig {
    /// Mode selection (§4.8): an incremental dump always canonicalizes, so
    /// suppressed/boundary commits can be reasoned about as one sequence;
    /// otherwise `adaptive` picks canonical only for small histories.
    pub fn resolve_canonical(&self, total_master_bytes: u64) -> bool {
        if self.fromtime > 0 {
            return true;
        }
        match self.report_mode {
            ReportMode::Canonical => true,
            ReportMode::Fast => false,
            ReportMode::Adaptive => total_master_bytes <= ADAPTIVE_THRESHOLD_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<toml::de::Error>,
    },
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let deserializer = toml::Deserializer::new(&text);
        serde_path_to_error::deserialize(deserializer).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate_timezone(&self) -> Result<(), ExportError> {
        if self.timezone.is_empty() {
            return Ok(());
        }
        use std::str::FromStr as _;
        chrono_tz::Tz::from_str(&self.timezone)
            .map(|_| ())
            .map_err(|_| ExportError::UnknownTimezone(self.timezone.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_fast_mode_and_utc() {
        let config = ExportConfig::default();
        assert_eq!(config.report_mode, ReportMode::Fast);
        assert!(!config.resolve_canonical(0));
        assert_eq!(config.timezone, "");
    }

    #[test]
    fn loads_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.toml");
        std::fs::write(&path, "report_mode = \"canonical\"\ntimezone = \"UTC\"\n").unwrap();
        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.report_mode, ReportMode::Canonical);
        assert!(config.resolve_canonical(0));
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    fn fromtime_forces_canonical_regardless_of_report_mode() {
        let config = ExportConfig {
            fromtime: 100,
            ..ExportConfig::default()
        };
        assert!(config.resolve_canonical(u64::MAX));
    }

    #[test]
    fn adaptive_picks_canonical_only_below_threshold() {
        let config = ExportConfig {
            report_mode: ReportMode::Adaptive,
            ..ExportConfig::default()
        };
        assert!(config.resolve_canonical(1_000_000));
        assert!(!config.resolve_canonical(1_000_001));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let config = ExportConfig {
            timezone: "Not/AZone".to_string(),
            ..ExportConfig::default()
        };
        assert!(config.validate_timezone().is_err());
    }
}

//! Logging setup (§9.2 ambient stack).
//!
//! `tracing` carries structured events through the engine (mark allocation,
//! blob staging, commit emission); `tracing-subscriber` renders them to
//! stderr with ANSI color via `colored`-compatible level formatting, and
//! `tracing-log` bridges the handful of `log::warn!`/`log::error!` calls
//! third-party crates (e.g. `toml`) may emit underneath.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Initializes the global tracing subscriber at the given verbosity. Call
/// once, near the start of `main`; a second call panics since the
/// underlying subscriber can only be installed once per process.
pub fn init(level: tracing::Level) {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    if let Err(err) = tracing_log::LogTracer::init() {
        tracing::debug!("log-to-tracing bridge already installed: {err}");
    }
}

/// Maps the CLI's `-v`/`-q` counters onto a `tracing::Level`, clamping at
/// the ends rather than erroring: asking for quieter-than-ERROR or
/// louder-than-TRACE just gets you ERROR or TRACE.
pub fn level_from_verbosity(verbose: u8, quiet: u8) -> tracing::Level {
    const LEVELS: [tracing::Level; 5] = [
        tracing::Level::ERROR,
        tracing::Level::WARN,
        tracing::Level::INFO,
        tracing::Level::DEBUG,
        tracing::Level::TRACE,
    ];
    let default_index = 2i32; // INFO
    let index = (default_index + verbose as i32 - quiet as i32).clamp(0, LEVELS.len() as i32 - 1);
    LEVELS[index as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_verbosity_is_info() {
        assert_eq!(level_from_verbosity(0, 0), tracing::Level::INFO);
    }

    #[test]
    fn clamps_past_trace_and_error() {
        assert_eq!(level_from_verbosity(10, 0), tracing::Level::TRACE);
        assert_eq!(level_from_verbosity(0, 10), tracing::Level::ERROR);
    }
}

//! Progress reporting abstraction (§9.5 ambient stack).
//!
//! The engine's two passes (blob staging, commit emission) each know their
//! total item count up front, so a single growing/advancing bar covers both
//! — same shape as `ui.rs`'s `ProgressStatus`, trimmed down since this
//! engine has no concurrent task queue to multiplex over.

pub trait ProgressSink {
    fn start_phase(&mut self, name: &str, total: u64);
    fn inc(&mut self, delta: u64);
    fn finish_phase(&mut self);
}

/// No-op sink for non-interactive runs (piped output, tests).
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn start_phase(&mut self, _name: &str, _total: u64) {}
    fn inc(&mut self, _delta: u64) {}
    fn finish_phase(&mut self) {}
}

pub struct IndicatifProgress {
    multi: indicatif::MultiProgress,
    bar: Option<indicatif::ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        IndicatifProgress {
            multi: indicatif::MultiProgress::new(),
            bar: None,
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifProgress {
    fn start_phase(&mut self, name: &str, total: u64) {
        let style = indicatif::ProgressStyle::with_template(
            "{prefix:.bold} [{bar:40}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
        let pb = self.multi.add(indicatif::ProgressBar::new(total));
        pb.set_style(style);
        pb.set_prefix(name.to_string());
        self.bar = Some(pb);
    }

    fn inc(&mut self, delta: u64) {
        if let Some(pb) = &self.bar {
            pb.inc(delta);
        }
    }

    fn finish_phase(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_progress_accepts_calls_without_panicking() {
        let mut sink = NullProgress;
        sink.start_phase("blobs", 10);
        sink.inc(3);
        sink.finish_phase();
    }
}

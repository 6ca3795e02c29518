//! Append-only record of stage durations for successful runs.

use std::path::{Path, PathBuf};

use handscribe_core::{AppendLog, Result, StageTiming};

use crate::TRACING_TARGET_METRICS;

/// One timing line, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingLogEntry {
    /// Recognition time.
    pub ocr_secs: f64,
    /// Correction time.
    pub correction_secs: f64,
    /// Whole-run time.
    pub total_secs: f64,
}

impl From<&StageTiming> for TimingLogEntry {
    fn from(timing: &StageTiming) -> Self {
        Self {
            ocr_secs: timing.ocr.as_secs_f64(),
            correction_secs: timing.correction.as_secs_f64(),
            total_secs: timing.total.as_secs_f64(),
        }
    }
}

impl std::fmt::Display for TimingLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OCR: {:.2} sec, Correction: {:.2} sec, Total: {:.2} sec",
            self.ocr_secs, self.correction_secs, self.total_secs
        )
    }
}

/// Timing metrics sink backed by a text file.
///
/// Safe to share between concurrent pipeline runs.
#[derive(Debug)]
pub struct TimingLog {
    log: AppendLog,
}

impl TimingLog {
    /// Creates a sink appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: AppendLog::new(path),
        }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Appends one timestamped entry.
    pub async fn record(&self, timing: &StageTiming) -> Result<()> {
        let entry = TimingLogEntry::from(timing);
        self.log.append_stamped(&entry.to_string()).await?;

        tracing::debug!(
            target: TRACING_TARGET_METRICS,
            ocr_secs = entry.ocr_secs,
            correction_secs = entry.correction_secs,
            total_secs = entry.total_secs,
            "Timing recorded"
        );

        Ok(())
    }
}

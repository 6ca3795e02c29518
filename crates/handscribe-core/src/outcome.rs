//! Pipeline outcome and per-stage timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::Error;

/// Stage of the pipeline an error originated from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Image to text.
    Recognition,
    /// Text to corrected text.
    Correction,
}

/// An error tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct StageError {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub error: Error,
}

impl StageError {
    /// Creates a new stage error.
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }
}

/// Durations measured for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTiming {
    /// Time spent in recognition.
    pub ocr: Duration,
    /// Time spent in correction, zero when correction never ran.
    pub correction: Duration,
    /// Wall-clock time across the whole run.
    pub total: Duration,
}

impl StageTiming {
    /// Creates a new timing record.
    pub fn new(ocr: Duration, correction: Duration, total: Duration) -> Self {
        Self {
            ocr,
            correction,
            total,
        }
    }
}

/// Result of running one image through both stages.
///
/// Constructors uphold the partial-result rules: a recognition failure
/// carries no text at all, a correction failure keeps the recognized text
/// but never any corrected text.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Text returned by the recognition stage.
    pub recognized_text: String,
    /// Text returned by the correction stage.
    pub corrected_text: String,
    /// Measured stage durations.
    pub timing: StageTiming,
    /// The failure that stopped the run, if any.
    pub error: Option<StageError>,
}

impl PipelineOutcome {
    /// Both stages succeeded.
    pub fn success(
        recognized_text: impl Into<String>,
        corrected_text: impl Into<String>,
        timing: StageTiming,
    ) -> Self {
        Self {
            recognized_text: recognized_text.into(),
            corrected_text: corrected_text.into(),
            timing,
            error: None,
        }
    }

    /// Recognition failed; correction never ran.
    pub fn recognition_failed(ocr: Duration, total: Duration, error: Error) -> Self {
        Self {
            recognized_text: String::new(),
            corrected_text: String::new(),
            timing: StageTiming::new(ocr, Duration::ZERO, total),
            error: Some(StageError::new(Stage::Recognition, error)),
        }
    }

    /// Recognition succeeded but correction failed.
    pub fn correction_failed(
        recognized_text: impl Into<String>,
        timing: StageTiming,
        error: Error,
    ) -> Self {
        Self {
            recognized_text: recognized_text.into(),
            corrected_text: String::new(),
            timing,
            error: Some(StageError::new(Stage::Correction, error)),
        }
    }

    /// Returns true when both stages succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the stage that failed, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.error.as_ref().map(|e| e.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_failure_has_no_text() {
        let outcome = PipelineOutcome::recognition_failed(
            Duration::from_millis(120),
            Duration::from_millis(121),
            Error::empty_result(),
        );

        assert!(!outcome.is_success());
        assert_eq!(outcome.failed_stage(), Some(Stage::Recognition));
        assert!(outcome.recognized_text.is_empty());
        assert!(outcome.corrected_text.is_empty());
        assert_eq!(outcome.timing.correction, Duration::ZERO);
    }

    #[test]
    fn test_correction_failure_keeps_recognized_text() {
        let timing = StageTiming::new(
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(4),
        );
        let outcome =
            PipelineOutcome::correction_failed("привет мир", timing, Error::transport());

        assert_eq!(outcome.failed_stage(), Some(Stage::Correction));
        assert_eq!(outcome.recognized_text, "привет мир");
        assert!(outcome.corrected_text.is_empty());
        assert_eq!(outcome.timing.correction, Duration::from_secs(3));
    }

    #[test]
    fn test_stage_error_display() {
        let error = StageError::new(
            Stage::Correction,
            Error::remote_service().with_message("quota exceeded"),
        );
        assert_eq!(
            error.to_string(),
            "correction failed: RemoteService: quota exceeded"
        );
    }
}

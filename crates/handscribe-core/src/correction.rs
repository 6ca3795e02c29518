//! Correction stage: raw text in, corrected text out.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::Result;

/// Corrected text produced by a language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionResult {
    /// Corrected text, trimmed.
    pub corrected_text: String,
    /// Wall-clock time spent on the correction call, retries included.
    pub elapsed: Duration,
    /// Number of attempts made before the call succeeded.
    pub attempts: u32,
}

impl CorrectionResult {
    /// Creates a new correction result.
    pub fn new(corrected_text: impl Into<String>, elapsed: Duration, attempts: u32) -> Self {
        Self {
            corrected_text: corrected_text.into(),
            elapsed,
            attempts,
        }
    }
}

/// A service that fixes recognition mistakes in text.
#[async_trait::async_trait]
pub trait Corrector: Send + Sync {
    /// Returns a corrected version of `source_text`.
    ///
    /// Cancelling `cancel` aborts both an in-flight request and any pending
    /// retry delay.
    async fn correct(
        &self,
        source_text: &str,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<CorrectionResult>;
}

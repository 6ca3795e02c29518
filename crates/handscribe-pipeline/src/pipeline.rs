//! Two-stage orchestration: recognize, then correct.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use handscribe_core::{CancellationToken, Corrector, PipelineOutcome, Recognizer, StageTiming};

use crate::{PipelineConfig, TRACING_TARGET_PIPELINE, TimingLog};

/// Inputs for one pipeline run.
#[derive(Clone)]
pub struct ProcessRequest {
    /// Image to recognize.
    pub image_path: PathBuf,
    /// Cloud folder the recognition call is billed to.
    pub folder_id: String,
    /// Bearer token for the recognition service.
    pub auth_token: String,
    /// API key for the correction service.
    pub api_key: String,
}

impl std::fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("image_path", &self.image_path)
            .field("folder_id", &self.folder_id)
            .finish_non_exhaustive()
    }
}

/// Runs images through a [`Recognizer`] and then a [`Corrector`].
///
/// Cloning is cheap; clones share the services and the timing log.
#[derive(Clone)]
pub struct Pipeline {
    recognizer: Arc<dyn Recognizer>,
    corrector: Arc<dyn Corrector>,
    timing_log: Arc<TimingLog>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("timing_log", &self.timing_log.path())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline recording timings into `timing_log`.
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        corrector: Arc<dyn Corrector>,
        timing_log: TimingLog,
    ) -> Self {
        Self {
            recognizer,
            corrector,
            timing_log: Arc::new(timing_log),
        }
    }

    /// Creates a pipeline from configuration.
    pub fn from_config(
        recognizer: Arc<dyn Recognizer>,
        corrector: Arc<dyn Corrector>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            recognizer,
            corrector,
            TimingLog::new(config.timing_log_path.clone()),
        )
    }

    /// Returns the timing sink.
    pub fn timing_log(&self) -> &TimingLog {
        &self.timing_log
    }

    /// Processes one image.
    ///
    /// Failures are reported inside the returned outcome. A timing entry is
    /// written only when both stages succeed.
    pub async fn process(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        let started = Instant::now();

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            path = %request.image_path.display(),
            "Pipeline run started"
        );

        let recognized = self
            .recognizer
            .recognize(
                &request.image_path,
                &request.folder_id,
                &request.auth_token,
                cancel,
            )
            .await;

        let recognized = match recognized {
            Ok(result) => result,
            Err(error) => {
                let elapsed = started.elapsed();
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    stage = "recognition",
                    kind = error.kind_str(),
                    error = %error,
                    "Pipeline run failed"
                );
                return PipelineOutcome::recognition_failed(elapsed, elapsed, error);
            }
        };

        let correction_started = Instant::now();
        let corrected = self
            .corrector
            .correct(&recognized.text, &request.api_key, cancel)
            .await;

        let corrected = match corrected {
            Ok(result) => result,
            Err(error) => {
                let timing = StageTiming::new(
                    recognized.elapsed,
                    correction_started.elapsed(),
                    started.elapsed(),
                );
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    stage = "correction",
                    kind = error.kind_str(),
                    error = %error,
                    "Pipeline run failed"
                );
                return PipelineOutcome::correction_failed(recognized.text, timing, error);
            }
        };

        let timing = StageTiming::new(recognized.elapsed, corrected.elapsed, started.elapsed());

        if let Err(error) = self.timing_log.record(&timing).await {
            tracing::warn!(
                target: TRACING_TARGET_PIPELINE,
                path = %self.timing_log.path().display(),
                error = %error,
                "Failed to write timing log"
            );
        }

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            ocr_ms = timing.ocr.as_millis(),
            correction_ms = timing.correction.as_millis(),
            total_ms = timing.total.as_millis(),
            attempts = corrected.attempts,
            "Pipeline run finished"
        );

        PipelineOutcome::success(recognized.text, corrected.corrected_text, timing)
    }
}

//! Pipeline configuration.

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default location of the timing log.
pub const DEFAULT_TIMING_LOG_PATH: &str = "timing.log";

/// Configuration for [`Pipeline`].
///
/// [`Pipeline`]: crate::Pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PipelineConfig {
    /// File receiving one timing line per successful run
    #[cfg_attr(
        feature = "config",
        arg(long = "timing-log-path", env = "TIMING_LOG_PATH", default_value = DEFAULT_TIMING_LOG_PATH)
    )]
    #[serde(default = "default_timing_log_path")]
    pub timing_log_path: PathBuf,
}

fn default_timing_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_TIMING_LOG_PATH)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timing_log_path: default_timing_log_path(),
        }
    }
}

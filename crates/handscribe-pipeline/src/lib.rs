#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for pipeline runs.
pub const TRACING_TARGET_PIPELINE: &str = "handscribe_pipeline::run";

/// Tracing target for the timing log.
pub const TRACING_TARGET_METRICS: &str = "handscribe_pipeline::metrics";

mod config;
mod pipeline;
mod timing_log;

pub use crate::config::{DEFAULT_TIMING_LOG_PATH, PipelineConfig};
pub use crate::pipeline::{Pipeline, ProcessRequest};
pub use crate::timing_log::{TimingLog, TimingLogEntry};

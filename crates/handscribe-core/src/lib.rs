#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for recognition operations.
pub const TRACING_TARGET_RECOGNITION: &str = "handscribe_core::recognition";

/// Tracing target for correction operations.
pub const TRACING_TARGET_CORRECTION: &str = "handscribe_core::correction";

/// Tracing target for file-backed diagnostics and logs.
pub const TRACING_TARGET_FILES: &str = "handscribe_core::files";

mod error;
mod files;
mod outcome;

pub mod correction;
pub mod recognition;

pub use correction::{CorrectionResult, Corrector};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use files::{AppendLog, DiagnosticDump, rfc3339_now};
pub use outcome::{PipelineOutcome, Stage, StageError, StageTiming};
pub use recognition::{RecognitionModel, RecognitionResult, Recognizer};
// Re-exported so implementors of the traits do not need a direct dependency.
pub use tokio_util::sync::CancellationToken;

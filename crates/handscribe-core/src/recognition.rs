//! Recognition stage: image in, raw text out.

use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Recognition model requested from the OCR service.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString
)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecognitionModel {
    /// Model tuned for handwritten text.
    #[default]
    Handwritten,
    /// Model tuned for printed pages.
    Page,
}

/// Text recognized from a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Recognized text, trimmed and never empty.
    pub text: String,
    /// Wall-clock time spent on the recognition call.
    pub elapsed: Duration,
}

impl RecognitionResult {
    /// Creates a new recognition result.
    pub fn new(text: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            text: text.into(),
            elapsed,
        }
    }
}

/// A service that turns an image of handwriting into text.
///
/// Implementations must fail with [`ErrorKind::FileAccess`] before any
/// network traffic when the image cannot be read, and with
/// [`ErrorKind::EmptyResult`] when the service returns no text.
///
/// [`ErrorKind::FileAccess`]: crate::ErrorKind::FileAccess
/// [`ErrorKind::EmptyResult`]: crate::ErrorKind::EmptyResult
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognizes the text in the image at `image_path`.
    async fn recognize(
        &self,
        image_path: &Path,
        folder_id: &str,
        auth_token: &str,
        cancel: &CancellationToken,
    ) -> Result<RecognitionResult>;
}

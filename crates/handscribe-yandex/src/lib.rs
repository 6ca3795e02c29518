#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

//! ## Quick Start
//!
//! ```ignore
//! use handscribe_core::{CancellationToken, Recognizer};
//! use handscribe_reqwest::HttpConfig;
//! use handscribe_yandex::{YandexConfig, YandexOcrClient};
//!
//! let client = YandexOcrClient::new(YandexConfig::default(), &HttpConfig::default())?;
//! let result = client
//!     .recognize("note.jpg".as_ref(), "b1g...", "t1.9eu...", &CancellationToken::new())
//!     .await?;
//! println!("{}", result.text);
//! ```

/// Tracing target for OCR client operations.
pub const TRACING_TARGET_CLIENT: &str = "handscribe_yandex::client";

/// Tracing target for IAM token operations.
pub const TRACING_TARGET_IAM: &str = "handscribe_yandex::iam";

mod client;
mod config;
mod iam;
mod wire;

pub use crate::client::YandexOcrClient;
pub use crate::config::{
    DEFAULT_IAM_URL, DEFAULT_OCR_DUMP_PATH, DEFAULT_OCR_URL, IamConfig, YandexConfig,
};
pub use crate::iam::{IamClient, IamToken, RefreshPolicy, SharedToken, TokenRefresher};

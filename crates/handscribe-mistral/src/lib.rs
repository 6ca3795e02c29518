#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for correction client operations.
pub const TRACING_TARGET_CLIENT: &str = "handscribe_mistral::client";

mod client;
mod config;
mod prompt;
mod retry;
mod wire;

pub use crate::client::MistralClient;
pub use crate::config::{
    DEFAULT_CHAT_URL, DEFAULT_MISTRAL_DUMP_PATH, DEFAULT_MODEL, DEFAULT_PROXY_LOG_PATH,
    MistralConfig,
};
pub use crate::prompt::{CORRECTION_INSTRUCTION, SENTINEL_MARKER, build_prompt};
pub use crate::retry::RetryPolicy;

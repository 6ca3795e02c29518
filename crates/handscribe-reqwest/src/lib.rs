#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for HTTP client construction.
pub const TRACING_TARGET_CLIENT: &str = "handscribe_reqwest::client";

/// Tracing target for the external IP probe.
pub const TRACING_TARGET_PROBE: &str = "handscribe_reqwest::probe";

mod client;
mod config;
mod error;
mod probe;
mod proxy;

pub use crate::client::build_client;
pub use crate::config::{DEFAULT_TIMEOUT_SECS, HttpConfig};
pub use crate::error::{map_reqwest_error, read_body, send};
pub use crate::probe::{DEFAULT_IP_CHECK_URL, IpProbe, ProbeReport};
pub use crate::proxy::{DEFAULT_PROXY_ADDR, Egress, ProxyConfig};

//! Configuration for the Mistral correction client.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use handscribe_core::{Error, Result};
use handscribe_reqwest::DEFAULT_IP_CHECK_URL;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::RetryPolicy;

/// Default chat-completions endpoint.
pub const DEFAULT_CHAT_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// Default model name.
pub const DEFAULT_MODEL: &str = "mistral-large-latest";

/// Default location of the raw correction response dump.
pub const DEFAULT_MISTRAL_DUMP_PATH: &str = "mistral_response.json";

/// Default location of the proxy check log.
pub const DEFAULT_PROXY_LOG_PATH: &str = "proxy_check.log";

/// Configuration for [`MistralClient`].
///
/// [`MistralClient`]: crate::MistralClient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MistralConfig {
    /// Chat-completions endpoint
    #[cfg_attr(
        feature = "config",
        arg(long = "mistral-url", env = "MISTRAL_URL", default_value = DEFAULT_CHAT_URL)
    )]
    #[serde(default = "default_chat_url")]
    pub chat_url: Url,

    /// Model used for correction
    #[cfg_attr(
        feature = "config",
        arg(id = "mistral_model", long = "mistral-model", env = "MISTRAL_MODEL", default_value = DEFAULT_MODEL)
    )]
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[cfg_attr(
        feature = "config",
        arg(long = "mistral-temperature", env = "MISTRAL_TEMPERATURE", default_value = "0.3")
    )]
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[cfg_attr(
        feature = "config",
        arg(long = "mistral-max-tokens", env = "MISTRAL_MAX_TOKENS", default_value = "2000")
    )]
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Attempts per correction, including the first
    #[cfg_attr(
        feature = "config",
        arg(long = "mistral-max-attempts", env = "MISTRAL_MAX_ATTEMPTS", default_value = "3")
    )]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds, multiplied by the failed attempt number
    #[cfg_attr(
        feature = "config",
        arg(long = "mistral-backoff-ms", env = "MISTRAL_BACKOFF_MS", default_value = "1000")
    )]
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// IP echo service queried before each correction
    #[cfg_attr(
        feature = "config",
        arg(long = "ip-check-url", env = "IP_CHECK_URL", default_value = DEFAULT_IP_CHECK_URL)
    )]
    #[serde(default = "default_ip_check_url")]
    pub ip_check_url: Option<Url>,

    /// File receiving one line per IP check
    #[cfg_attr(
        feature = "config",
        arg(long = "proxy-log-path", env = "PROXY_LOG_PATH", default_value = DEFAULT_PROXY_LOG_PATH)
    )]
    #[serde(default = "default_proxy_log_path")]
    pub proxy_log_path: Option<PathBuf>,

    /// File receiving the raw body of the latest correction response
    #[cfg_attr(
        feature = "config",
        arg(
            id = "mistral_dump_path",
            long = "mistral-dump-path",
            env = "MISTRAL_DUMP_PATH",
            default_value = DEFAULT_MISTRAL_DUMP_PATH
        )
    )]
    #[serde(default = "default_dump_path")]
    pub dump_path: Option<PathBuf>,

    /// Skip the IP check entirely
    #[cfg_attr(
        feature = "config",
        arg(long = "no-ip-check", env = "NO_IP_CHECK", default_value_t = false)
    )]
    #[serde(default)]
    pub no_ip_check: bool,

    /// Do not write the proxy check log
    #[cfg_attr(
        feature = "config",
        arg(long = "no-proxy-log", env = "NO_PROXY_LOG", default_value_t = false)
    )]
    #[serde(default)]
    pub no_proxy_log: bool,

    /// Do not dump correction responses
    #[cfg_attr(
        feature = "config",
        arg(
            id = "no_mistral_dump",
            long = "no-mistral-dump",
            env = "NO_MISTRAL_DUMP",
            default_value_t = false
        )
    )]
    #[serde(default)]
    pub no_dump: bool,
}

fn default_chat_url() -> Url {
    Url::parse(DEFAULT_CHAT_URL).expect("default chat URL is valid")
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_ip_check_url() -> Option<Url> {
    Url::parse(DEFAULT_IP_CHECK_URL).ok()
}

fn default_proxy_log_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_PROXY_LOG_PATH))
}

fn default_dump_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_MISTRAL_DUMP_PATH))
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            chat_url: default_chat_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            ip_check_url: default_ip_check_url(),
            proxy_log_path: default_proxy_log_path(),
            dump_path: default_dump_path(),
            no_ip_check: false,
            no_proxy_log: false,
            no_dump: false,
        }
    }
}

impl MistralConfig {
    /// Sets the chat-completions endpoint.
    #[must_use]
    pub fn with_chat_url(mut self, url: Url) -> Self {
        self.chat_url = url;
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.max_attempts = policy.max_attempts;
        self.backoff_ms = u64::try_from(policy.backoff_unit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets or disables the IP check.
    #[must_use]
    pub fn with_ip_check_url(mut self, url: Option<Url>) -> Self {
        self.no_ip_check = url.is_none();
        self.ip_check_url = url;
        self
    }

    /// Sets or disables the proxy check log.
    #[must_use]
    pub fn with_proxy_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.no_proxy_log = path.is_none();
        self.proxy_log_path = path;
        self
    }

    /// Sets or disables the response dump.
    #[must_use]
    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.no_dump = path.is_none();
        self.dump_path = path;
        self
    }

    /// Returns the IP echo service, unless the check is disabled.
    pub fn ip_check_url(&self) -> Option<&Url> {
        self.ip_check_url.as_ref().filter(|_| !self.no_ip_check)
    }

    /// Returns the proxy check log location, unless the log is disabled.
    pub fn proxy_log_path(&self) -> Option<&PathBuf> {
        self.proxy_log_path.as_ref().filter(|_| !self.no_proxy_log)
    }

    /// Returns the response dump location, unless dumping is disabled.
    pub fn dump_path(&self) -> Option<&PathBuf> {
        self.dump_path.as_ref().filter(|_| !self.no_dump)
    }

    /// Returns the retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }

    /// Checks the configuration for values the service would reject.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::auth_or_config().with_message("model name must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::auth_or_config().with_message(format!(
                "temperature {} is out of range 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::auth_or_config().with_message("max tokens must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(Error::auth_or_config().with_message("at least one attempt is required"));
        }
        Ok(())
    }
}

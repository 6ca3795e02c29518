//! Configuration for the Yandex OCR and IAM clients.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use handscribe_core::{DiagnosticDump, Error, RecognitionModel, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default text recognition endpoint.
pub const DEFAULT_OCR_URL: &str = "https://ocr.api.cloud.yandex.net/ocr/v1/recognizeText";

/// Default IAM token exchange endpoint.
pub const DEFAULT_IAM_URL: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

/// Default location of the raw OCR response dump.
pub const DEFAULT_OCR_DUMP_PATH: &str = "api_response.json";

/// Configuration for [`YandexOcrClient`].
///
/// [`YandexOcrClient`]: crate::YandexOcrClient
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct YandexConfig {
    /// Text recognition endpoint
    #[cfg_attr(
        feature = "config",
        arg(long = "ocr-url", env = "YANDEX_OCR_URL", default_value = DEFAULT_OCR_URL)
    )]
    #[serde(default = "default_ocr_url")]
    pub ocr_url: Url,

    /// Languages expected in the image
    #[cfg_attr(
        feature = "config",
        arg(
            long = "ocr-languages",
            env = "YANDEX_OCR_LANGUAGES",
            value_delimiter = ',',
            default_value = "ru"
        )
    )]
    #[serde(default = "default_language_codes")]
    pub language_codes: Vec<String>,

    /// Recognition model
    #[cfg_attr(
        feature = "config",
        arg(id = "ocr_model", long = "ocr-model", env = "YANDEX_OCR_MODEL", value_enum, default_value_t)
    )]
    #[serde(default)]
    pub model: RecognitionModel,

    /// MIME type sent with every image
    #[cfg_attr(
        feature = "config",
        arg(long = "ocr-mime-type", env = "YANDEX_OCR_MIME_TYPE", default_value = "image/jpeg")
    )]
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// File receiving the raw body of the latest OCR response
    #[cfg_attr(
        feature = "config",
        arg(id = "ocr_dump_path", long = "ocr-dump-path", env = "OCR_DUMP_PATH", default_value = DEFAULT_OCR_DUMP_PATH)
    )]
    #[serde(default = "default_dump_path")]
    pub dump_path: Option<PathBuf>,

    /// Fail recognition when the response dump cannot be written
    #[cfg_attr(
        feature = "config",
        arg(long = "ocr-dump-required", env = "OCR_DUMP_REQUIRED", default_value_t = false)
    )]
    #[serde(default)]
    pub dump_required: bool,

    /// Do not dump OCR responses
    #[cfg_attr(
        feature = "config",
        arg(id = "no_ocr_dump", long = "no-ocr-dump", env = "NO_OCR_DUMP", default_value_t = false)
    )]
    #[serde(default)]
    pub no_dump: bool,
}

fn default_ocr_url() -> Url {
    Url::parse(DEFAULT_OCR_URL).expect("default OCR URL is valid")
}

fn default_language_codes() -> Vec<String> {
    vec!["ru".to_owned()]
}

fn default_mime_type() -> String {
    "image/jpeg".to_owned()
}

fn default_dump_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_OCR_DUMP_PATH))
}

impl Default for YandexConfig {
    fn default() -> Self {
        Self {
            ocr_url: default_ocr_url(),
            language_codes: default_language_codes(),
            model: RecognitionModel::default(),
            mime_type: default_mime_type(),
            dump_path: default_dump_path(),
            dump_required: false,
            no_dump: false,
        }
    }
}

impl YandexConfig {
    /// Sets the recognition endpoint.
    #[must_use]
    pub fn with_ocr_url(mut self, url: Url) -> Self {
        self.ocr_url = url;
        self
    }

    /// Sets the expected languages.
    #[must_use]
    pub fn with_language_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the recognition model.
    #[must_use]
    pub fn with_model(mut self, model: RecognitionModel) -> Self {
        self.model = model;
        self
    }

    /// Sets or disables the response dump.
    #[must_use]
    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.no_dump = path.is_none();
        self.dump_path = path;
        self
    }

    /// Makes a failed response dump fail the recognition call.
    #[must_use]
    pub fn with_required_dump(mut self, required: bool) -> Self {
        self.dump_required = required;
        self
    }

    /// Returns the dump writer described by this configuration.
    pub fn dump(&self) -> DiagnosticDump {
        let path = self.dump_path.clone().filter(|_| !self.no_dump);
        DiagnosticDump::from_path(path).with_required(self.dump_required)
    }

    /// Checks the configuration for values the service would reject.
    pub fn validate(&self) -> Result<()> {
        if self.language_codes.iter().all(|code| code.trim().is_empty()) {
            return Err(Error::auth_or_config().with_message("at least one OCR language is required"));
        }
        if self.mime_type.trim().is_empty() {
            return Err(Error::auth_or_config().with_message("OCR MIME type must not be empty"));
        }
        Ok(())
    }
}

/// Configuration for IAM token exchange and periodic refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct IamConfig {
    /// IAM token exchange endpoint
    #[cfg_attr(
        feature = "config",
        arg(long = "iam-url", env = "YANDEX_IAM_URL", default_value = DEFAULT_IAM_URL)
    )]
    #[serde(default = "default_iam_url")]
    pub iam_url: Url,

    /// Yandex Passport OAuth token used to obtain IAM tokens
    #[cfg_attr(
        feature = "config",
        arg(long = "yandex-oauth", env = "YANDEX_OAUTH", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub oauth_token: Option<String>,

    /// Seconds between token refreshes
    #[cfg_attr(
        feature = "config",
        arg(long = "iam-refresh-interval", env = "IAM_REFRESH_INTERVAL", default_value = "43200")
    )]
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Exchange attempts per refresh before giving up
    #[cfg_attr(
        feature = "config",
        arg(long = "iam-refresh-attempts", env = "IAM_REFRESH_ATTEMPTS", default_value = "5")
    )]
    #[serde(default = "default_refresh_attempts")]
    pub refresh_attempts: u32,

    /// Base delay in seconds between failed exchange attempts
    #[cfg_attr(
        feature = "config",
        arg(long = "iam-refresh-backoff", env = "IAM_REFRESH_BACKOFF", default_value = "5")
    )]
    #[serde(default = "default_refresh_backoff_secs")]
    pub refresh_backoff_secs: u64,
}

fn default_iam_url() -> Url {
    Url::parse(DEFAULT_IAM_URL).expect("default IAM URL is valid")
}

fn default_refresh_interval_secs() -> u64 {
    12 * 60 * 60
}

fn default_refresh_attempts() -> u32 {
    5
}

fn default_refresh_backoff_secs() -> u64 {
    5
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            iam_url: default_iam_url(),
            oauth_token: None,
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_attempts: default_refresh_attempts(),
            refresh_backoff_secs: default_refresh_backoff_secs(),
        }
    }
}

impl IamConfig {
    /// Returns the refresh interval.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Returns the base delay between failed attempts.
    pub fn refresh_backoff(&self) -> Duration {
        Duration::from_secs(self.refresh_backoff_secs)
    }

    /// Returns the OAuth token, treating an empty value as absent.
    pub fn oauth_token(&self) -> Option<&str> {
        self.oauth_token.as_deref().filter(|t| !t.is_empty())
    }
}

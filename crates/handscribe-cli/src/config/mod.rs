//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── http: HttpConfig              # Timeout, user agent
//! ├── proxy: ProxyConfig            # SOCKS5 egress for correction
//! ├── yandex: YandexConfig          # OCR endpoint, languages, model
//! ├── iam: IamConfig                # OAuth exchange and refresh
//! ├── mistral: MistralConfig        # Chat endpoint, model, retries
//! ├── pipeline: PipelineConfig      # Timing log
//! ├── credentials: CredentialsConfig
//! └── output: OutputConfig          # Reply format, language, logs
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod credentials;
mod output;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use handscribe_mistral::MistralConfig;
use handscribe_pipeline::PipelineConfig;
use handscribe_reqwest::{HttpConfig, ProxyConfig};
use handscribe_yandex::{IamConfig, YandexConfig};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use self::credentials::CredentialsConfig;
pub use self::output::{Language, LogFormat, OutputConfig, OutputFormat};
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "handscribe")]
#[command(about = "Recognize and correct handwritten text on images")]
#[command(version)]
pub struct Cli {
    /// Images to process
    #[arg(required = true, value_name = "IMAGE")]
    pub images: Vec<PathBuf>,

    #[clap(flatten)]
    pub http: HttpConfig,

    #[clap(flatten)]
    pub proxy: ProxyConfig,

    #[clap(flatten)]
    pub yandex: YandexConfig,

    #[clap(flatten)]
    pub iam: IamConfig,

    #[clap(flatten)]
    pub mistral: MistralConfig,

    #[clap(flatten)]
    pub pipeline: PipelineConfig,

    #[clap(flatten)]
    pub credentials: CredentialsConfig,

    #[clap(flatten)]
    pub output: OutputConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing on stderr with `RUST_LOG` filtering.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .context("failed to create env filter")?;

        let registry = tracing_subscriber::registry().with(filter);
        let result = match self.output.log_format {
            LogFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };

        result.context("failed to initialize tracing")
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.proxy.validate().context("invalid proxy configuration")?;
        self.yandex
            .validate()
            .context("invalid recognition configuration")?;
        self.mistral
            .validate()
            .context("invalid correction configuration")?;
        self.credentials
            .validate()
            .context("missing credentials")?;

        if self.credentials.iam_token().is_none() && self.iam.oauth_token().is_none() {
            anyhow::bail!("neither IAM_TOKEN nor YANDEX_OAUTH is set");
        }

        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            images = self.images.len(),
            http_timeout_secs = self.http.http_timeout,
            use_proxy = self.proxy.use_proxy,
            proxy_addr = %self.proxy.proxy_addr,
            ocr_url = %self.yandex.ocr_url,
            ocr_model = %self.yandex.model,
            mistral_url = %self.mistral.chat_url,
            mistral_model = %self.mistral.model,
            max_attempts = self.mistral.max_attempts,
            ip_check = self.mistral.ip_check_url().is_some(),
            timing_log = %self.pipeline.timing_log_path.display(),
            format = ?self.output.format,
            jobs = self.output.jobs.get(),
            "Configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    const REQUIRED: [&str; 7] = [
        "handscribe",
        "--folder-id",
        "b1g-folder",
        "--iam-token",
        "t1.token",
        "--mistral-api-key",
        "key",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::try_parse_from(REQUIRED.iter().chain(extra).copied()).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_images_and_flags() {
        let cli = parse(&[
            "--format",
            "txt",
            "--language",
            "en",
            "--use-proxy",
            "true",
            "--proxy-addr",
            "10.0.0.1:1080",
            "--mistral-model",
            "mistral-small-latest",
            "a.jpg",
            "b.jpg",
        ]);

        assert_eq!(cli.images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
        assert_eq!(cli.output.format, OutputFormat::Txt);
        assert_eq!(cli.output.language, Language::En);
        assert!(cli.proxy.use_proxy);
        assert_eq!(cli.proxy.proxy_addr, "10.0.0.1:1080");
        assert_eq!(cli.mistral.model, "mistral-small-latest");
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_diagnostics_can_be_switched_off() {
        let cli = parse(&["a.jpg"]);
        assert!(cli.mistral.ip_check_url().is_some());
        assert!(cli.mistral.dump_path().is_some());
        assert!(cli.yandex.dump().path().is_some());

        let cli = parse(&[
            "--no-ip-check",
            "--no-proxy-log",
            "--no-mistral-dump",
            "--no-ocr-dump",
            "a.jpg",
        ]);
        assert_eq!(cli.mistral.ip_check_url(), None);
        assert_eq!(cli.mistral.proxy_log_path(), None);
        assert_eq!(cli.mistral.dump_path(), None);
        assert_eq!(cli.yandex.dump().path(), None);
    }

    #[test]
    fn test_images_are_required() {
        assert!(Cli::try_parse_from(REQUIRED).is_err());
    }

    #[test]
    fn test_validate_requires_an_iam_source() {
        let mut cli = parse(&["a.jpg"]);
        cli.credentials.iam_token = None;
        cli.iam.oauth_token = None;
        assert!(cli.validate().is_err());

        cli.iam.oauth_token = Some("oauth".to_owned());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_proxy_address() {
        let cli = parse(&["--use-proxy", "true", "--proxy-addr", "nowhere", "a.jpg"]);
        assert!(cli.validate().is_err());
    }
}

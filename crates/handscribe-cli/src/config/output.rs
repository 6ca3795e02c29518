//! Reply and logging output options.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

/// How corrected text is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Printed to stdout.
    #[default]
    Text,
    /// Written to a `.txt` file per image.
    Txt,
    /// Written to a `.pdf` file per image.
    Pdf,
}

/// Language of the reply labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct OutputConfig {
    /// Reply format
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t)]
    #[serde(default)]
    pub format: OutputFormat,

    /// Reply language
    #[arg(long, env = "REPLY_LANGUAGE", value_enum, default_value_t)]
    #[serde(default)]
    pub language: Language,

    /// Append stage durations to every successful reply
    #[arg(long = "show-timing", env = "SHOW_TIMING")]
    #[serde(default)]
    pub show_timing: bool,

    /// Directory receiving `.txt` and `.pdf` replies
    #[arg(long = "output-dir", env = "OUTPUT_DIR", default_value = ".")]
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// TrueType font embedded into PDF replies
    #[arg(long = "pdf-font", env = "PDF_FONT", default_value = DEFAULT_PDF_FONT)]
    #[serde(default = "default_pdf_font")]
    pub pdf_font: PathBuf,

    /// Images processed concurrently
    #[arg(long, env = "JOBS", default_value = "4")]
    #[serde(default = "default_jobs")]
    pub jobs: NonZeroUsize,

    /// Log line format
    #[arg(long = "log-format", env = "LOG_FORMAT", value_enum, default_value_t)]
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Font looked up in the working directory by default.
pub const DEFAULT_PDF_FONT: &str = "DejaVuSans.ttf";

fn default_pdf_font() -> PathBuf {
    PathBuf::from(DEFAULT_PDF_FONT)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_jobs() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            language: Language::default(),
            show_timing: false,
            output_dir: default_output_dir(),
            pdf_font: default_pdf_font(),
            jobs: default_jobs(),
            log_format: LogFormat::default(),
        }
    }
}

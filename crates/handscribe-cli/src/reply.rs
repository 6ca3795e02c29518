//! Turns pipeline outcomes into user-facing replies.

use std::path::{Path, PathBuf};

use anyhow::Context;
use handscribe_core::{PipelineOutcome, StageTiming};
use handscribe_mistral::SENTINEL_MARKER;

use crate::TRACING_TARGET_REPLY;
use crate::config::{Language, OutputConfig, OutputFormat};
use crate::pdf::PdfWriter;

/// Localized reply strings.
#[derive(Debug)]
struct Labels {
    illegible: &'static str,
    error: &'static str,
    pdf_failed: &'static str,
    timing_header: &'static str,
    ocr: &'static str,
    correction: &'static str,
    total: &'static str,
    seconds: &'static str,
}

const RU: Labels = Labels {
    illegible: "Текст слишком неразборчивый, попробуйте сфотографировать получше и повторите попытку.",
    error: "Ошибка при распознавании текста",
    pdf_failed: "Ошибка при создании PDF",
    timing_header: "Время выполнения:",
    ocr: "OCR",
    correction: "Коррекция",
    total: "Общее",
    seconds: "сек",
};

const EN: Labels = Labels {
    illegible: "The text is too illegible, please take a clearer photo and try again.",
    error: "Error recognizing text",
    pdf_failed: "Error creating PDF",
    timing_header: "Execution time:",
    ocr: "OCR",
    correction: "Correction",
    total: "Total",
    seconds: "sec",
};

impl Language {
    fn labels(self) -> &'static Labels {
        match self {
            Self::Ru => &RU,
            Self::En => &EN,
        }
    }
}

/// A file attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// What the user receives for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub message: Option<String>,
    pub file: Option<ReplyFile>,
}

impl Reply {
    /// Builds the reply for `outcome` of the image at `image_path`.
    ///
    /// `pdf` lays out the PDF format; without it a PDF reply reports failure.
    pub fn render(
        outcome: &PipelineOutcome,
        image_path: &Path,
        output: &OutputConfig,
        pdf: Option<&PdfWriter>,
    ) -> Self {
        let labels = output.language.labels();
        let corrected = replace_sentinel(&outcome.corrected_text, labels);
        let error = outcome
            .error
            .as_ref()
            .map(|error| format!("{}: {error}", labels.error));
        let timing = (output.show_timing && outcome.is_success())
            .then(|| timing_footer(&outcome.timing, labels));

        let (body, file) = match output.format {
            OutputFormat::Text => (non_empty(corrected), None),
            OutputFormat::Txt => {
                let file = non_empty(corrected).map(|contents| ReplyFile {
                    name: format!("{}.txt", file_stem(image_path)),
                    contents: contents.into_bytes(),
                });
                (None, file)
            }
            OutputFormat::Pdf => match non_empty(corrected) {
                None => (None, None),
                Some(text) => match render_pdf(pdf, image_path, &text) {
                    Ok(file) => (None, Some(file)),
                    Err(error) => {
                        tracing::warn!(
                            target: TRACING_TARGET_REPLY,
                            image = %image_path.display(),
                            error = %error,
                            "Failed to create PDF reply"
                        );
                        (Some(labels.pdf_failed.to_owned()), None)
                    }
                },
            },
        };

        let parts: Vec<String> = [body, error, timing].into_iter().flatten().collect();
        let message = (!parts.is_empty()).then(|| parts.join("\n\n"));

        Self { message, file }
    }

    /// Prints the message to stdout and writes the file into `output_dir`.
    ///
    /// Returns the path of the written file, if any.
    pub async fn deliver(&self, output_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
        if let Some(message) = &self.message {
            println!("{message}");
        }

        let Some(file) = &self.file else {
            return Ok(None);
        };

        let path = output_dir.join(&file.name);
        tokio::fs::write(&path, &file.contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(Some(path))
    }
}

fn render_pdf(pdf: Option<&PdfWriter>, image_path: &Path, text: &str) -> anyhow::Result<ReplyFile> {
    let writer = pdf.context("no PDF font loaded")?;
    let stem = file_stem(image_path);
    let contents = writer.render(&stem, text)?;
    Ok(ReplyFile {
        name: format!("{stem}.pdf"),
        contents,
    })
}

fn replace_sentinel(text: &str, labels: &Labels) -> String {
    text.replace(SENTINEL_MARKER, labels.illegible)
}

fn timing_footer(timing: &StageTiming, labels: &Labels) -> String {
    let secs = labels.seconds;
    format!(
        "{}\n{}: {:.2} {secs}\n{}: {:.2} {secs}\n{}: {:.2} {secs}",
        labels.timing_header,
        labels.ocr,
        timing.ocr.as_secs_f64(),
        labels.correction,
        timing.correction.as_secs_f64(),
        labels.total,
        timing.total.as_secs_f64(),
    )
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_owned())
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

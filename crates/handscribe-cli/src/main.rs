#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod auth;
mod config;
mod pdf;
mod reply;
mod shutdown;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use handscribe_core::{CancellationToken, PipelineOutcome};
use handscribe_mistral::MistralClient;
use handscribe_pipeline::{Pipeline, ProcessRequest};
use handscribe_yandex::YandexOcrClient;

use crate::auth::AuthToken;
use crate::config::{Cli, OutputFormat};
use crate::pdf::PdfWriter;
use crate::reply::Reply;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "handscribe_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "handscribe_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "handscribe_cli::config";
pub const TRACING_TARGET_AUTH: &str = "handscribe_cli::auth";
pub const TRACING_TARGET_REPLY: &str = "handscribe_cli::reply";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    cli.init_tracing()?;
    cli.log();
    cli.validate().context("invalid configuration")?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown::cancel_on_signal(cancel.clone()));

    let result = process_images(&cli, &cancel).await;
    cancel.cancel();
    result
}

/// Builds the pipeline and runs every image through it.
async fn process_images(cli: &Cli, cancel: &CancellationToken) -> anyhow::Result<()> {
    let pdf = match cli.output.format {
        OutputFormat::Pdf => Some(PdfWriter::load(&cli.output.pdf_font).await?),
        OutputFormat::Text | OutputFormat::Txt => None,
    };
    let auth = auth::resolve(&cli.credentials, &cli.iam, &cli.http, cancel).await?;
    let pipeline = create_pipeline(cli)?;

    let runs = cli.images.iter().map(|image| {
        let pipeline = &pipeline;
        let auth = &auth;
        async move {
            let outcome = process_image(pipeline, cli, auth, image.clone(), cancel).await;
            (image, outcome)
        }
    });

    let mut outcomes = futures::stream::iter(runs).buffered(cli.output.jobs.get());
    let mut failures = 0usize;

    while let Some((image, outcome)) = outcomes.next().await {
        let reply = Reply::render(&outcome, image, &cli.output, pdf.as_ref());
        let pdf_failed = cli.output.format == OutputFormat::Pdf
            && !outcome.corrected_text.is_empty()
            && reply.file.is_none();
        let mut failed = !outcome.is_success() || pdf_failed;

        match reply.deliver(&cli.output.output_dir).await {
            Ok(Some(path)) => tracing::info!(
                target: TRACING_TARGET_REPLY,
                image = %image.display(),
                path = %path.display(),
                "Reply written"
            ),
            Ok(None) => {}
            Err(error) => {
                failed = true;
                tracing::error!(
                    target: TRACING_TARGET_REPLY,
                    image = %image.display(),
                    error = %error,
                    "Failed to deliver reply"
                );
            }
        }

        if failed {
            failures += 1;
        }
    }

    if cancel.is_cancelled() {
        anyhow::bail!("processing was cancelled");
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} images failed", cli.images.len());
    }

    Ok(())
}

/// Creates the recognition and correction clients and wires them into a pipeline.
fn create_pipeline(cli: &Cli) -> anyhow::Result<Pipeline> {
    let recognizer = YandexOcrClient::new(cli.yandex.clone(), &cli.http)
        .context("failed to create recognition client")?;
    let corrector = MistralClient::new(cli.mistral.clone(), &cli.http, &cli.proxy)
        .context("failed to create correction client")?;

    Ok(Pipeline::from_config(
        Arc::new(recognizer),
        Arc::new(corrector),
        &cli.pipeline,
    ))
}

async fn process_image(
    pipeline: &Pipeline,
    cli: &Cli,
    auth: &AuthToken,
    image_path: PathBuf,
    cancel: &CancellationToken,
) -> PipelineOutcome {
    let request = ProcessRequest {
        image_path,
        folder_id: cli.credentials.folder_id().unwrap_or_default().to_owned(),
        auth_token: auth.current().await,
        api_key: cli
            .credentials
            .mistral_api_key()
            .unwrap_or_default()
            .to_owned(),
    };

    pipeline.process(&request, cancel).await
}

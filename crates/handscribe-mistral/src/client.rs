//! Mistral chat-completions client.

use std::sync::Arc;
use std::time::Instant;

use handscribe_core::{
    AppendLog, CancellationToken, CorrectionResult, Corrector, DiagnosticDump, Error, Result,
};
use handscribe_reqwest::{Egress, HttpConfig, IpProbe, ProxyConfig, build_client, read_body, send};
use reqwest::{Client, StatusCode};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::wire::{ChatMessage, ChatRequest, ChatResponse};
use crate::{MistralConfig, RetryPolicy, TRACING_TARGET_CLIENT, build_prompt};

/// Outcome of a single failed attempt.
enum AttemptError {
    /// Worth another attempt while the policy allows it.
    Retryable(Error),
    /// Stop immediately.
    Terminal(Error),
}

struct MistralClientInner {
    http: Client,
    config: MistralConfig,
    egress: Egress,
    retry: RetryPolicy,
    probe: Option<IpProbe>,
    dump: DiagnosticDump,
}

/// HTTP client that asks a Mistral model to fix OCR mistakes.
#[derive(Clone)]
pub struct MistralClient {
    inner: Arc<MistralClientInner>,
}

impl std::fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralClient")
            .field("config", &self.inner.config)
            .field("egress", &self.inner.egress)
            .finish_non_exhaustive()
    }
}

impl MistralClient {
    /// Creates a new client routed according to `proxy`.
    pub fn new(config: MistralConfig, http: &HttpConfig, proxy: &ProxyConfig) -> Result<Self> {
        config.validate()?;
        proxy.validate()?;

        let egress = proxy.egress();
        let client = build_client(http, &egress)?;
        Ok(Self::with_http_client(config, client, egress))
    }

    /// Creates a client around an existing `reqwest` client.
    ///
    /// `egress` only describes how `http` was built; it is reported in logs
    /// and in the proxy check log.
    pub fn with_http_client(config: MistralConfig, http: Client, egress: Egress) -> Self {
        let retry = config.retry_policy();
        let dump = DiagnosticDump::from_path(config.dump_path().cloned());
        let probe = config.ip_check_url().cloned().map(|url| {
            let log = config
                .proxy_log_path()
                .cloned()
                .map(|path| Arc::new(AppendLog::new(path)));
            IpProbe::new(url, log)
        });

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            url = %config.chat_url,
            model = %config.model,
            max_attempts = retry.max_attempts,
            proxied = egress.is_proxied(),
            "Mistral client initialized"
        );

        Self {
            inner: Arc::new(MistralClientInner {
                http,
                config,
                egress,
                retry,
                probe,
                dump,
            }),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &MistralConfig {
        &self.inner.config
    }

    /// Corrects `source_text`, retrying transient failures.
    pub async fn correct(
        &self,
        source_text: &str,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<CorrectionResult> {
        if source_text.trim().is_empty() {
            return Err(Error::invalid_input().with_message("nothing to correct"));
        }
        if api_key.trim().is_empty() {
            return Err(Error::auth_or_config().with_message("Mistral API key is not set"));
        }

        let start = Instant::now();

        if let Some(probe) = &self.inner.probe {
            probe.check(&self.inner.http, &self.inner.egress, cancel).await;
        }

        let config = &self.inner.config;
        let body = ChatRequest {
            model: &config.model,
            messages: vec![ChatMessage::user(build_prompt(source_text))],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let max_attempts = self.inner.retry.effective_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            tracing::debug!(
                target: TRACING_TARGET_CLIENT,
                attempt,
                max_attempts,
                "Sending correction request"
            );

            let error = match self.attempt(&body, api_key, cancel).await {
                Ok(corrected) => {
                    let elapsed = start.elapsed();
                    if attempt > 1 {
                        tracing::info!(
                            target: TRACING_TARGET_CLIENT,
                            attempt,
                            "Request succeeded after retry"
                        );
                    }
                    tracing::info!(
                        target: TRACING_TARGET_CLIENT,
                        chars = corrected.chars().count(),
                        elapsed_ms = elapsed.as_millis(),
                        "Correction finished"
                    );
                    return Ok(CorrectionResult::new(corrected, elapsed, attempt));
                }
                Err(AttemptError::Terminal(error)) => {
                    tracing::error!(
                        target: TRACING_TARGET_CLIENT,
                        attempt,
                        error = %error,
                        "Request failed permanently"
                    );
                    return Err(error);
                }
                Err(AttemptError::Retryable(error)) => error,
            };

            let Some(backoff) = self.inner.retry.backoff(attempt) else {
                tracing::error!(
                    target: TRACING_TARGET_CLIENT,
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(error);
            };

            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                attempt,
                max_attempts,
                backoff_ms = backoff.as_millis(),
                error = %error,
                "Request failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::cancelled()),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    /// Makes one request and classifies its failure.
    async fn attempt(
        &self,
        body: &ChatRequest<'_>,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AttemptError> {
        let request = self
            .inner
            .http
            .post(self.inner.config.chat_url.clone())
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        let response = send(request, "correction request", cancel)
            .await
            .map_err(classify)?;
        let (status, bytes) = read_body(response, "correction response", cancel)
            .await
            .map_err(classify)?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            status = status.as_u16(),
            size = bytes.len(),
            "Received correction response"
        );

        self.inner.dump.write(&bytes).await.map_err(AttemptError::Terminal)?;

        if status != StatusCode::OK {
            return Err(AttemptError::Retryable(
                Error::remote_service()
                    .with_status(status.as_u16())
                    .with_message(format!(
                        "Mistral failed: status {}, body: {}",
                        status.as_u16(),
                        String::from_utf8_lossy(&bytes)
                    )),
            ));
        }

        let parsed: ChatResponse = serde_json::from_slice(&bytes).map_err(|e| {
            AttemptError::Retryable(
                Error::parse()
                    .with_message("failed to decode correction response")
                    .with_source(e),
            )
        })?;

        if let Some(error) = parsed.error() {
            let message = match &error.kind {
                Some(kind) => format!("Mistral error: {} (type: {kind})", error.message),
                None => format!("Mistral error: {}", error.message),
            };
            return Err(AttemptError::Terminal(
                Error::remote_service()
                    .with_status(status.as_u16())
                    .with_message(message),
            ));
        }

        parsed.first_content().map(str::to_owned).ok_or_else(|| {
            AttemptError::Retryable(Error::empty_result().with_message(format!(
                "no correction in response, body: {}",
                String::from_utf8_lossy(&bytes)
            )))
        })
    }
}

/// Cancellation stops the loop; every other transport failure is retried.
fn classify(error: Error) -> AttemptError {
    if error.is_cancelled() {
        AttemptError::Terminal(error)
    } else {
        AttemptError::Retryable(error)
    }
}

#[async_trait::async_trait]
impl Corrector for MistralClient {
    async fn correct(
        &self,
        source_text: &str,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> Result<CorrectionResult> {
        MistralClient::correct(self, source_text, api_key, cancel).await
    }
}

//! IAM token exchange and periodic refresh.

use std::sync::Arc;
use std::time::Duration;

use handscribe_core::{CancellationToken, Error, Result};
use handscribe_reqwest::{Egress, HttpConfig, build_client, read_body, send};
use jiff::Timestamp;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::{IamConfig, TRACING_TARGET_IAM};

/// A short-lived IAM token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct IamToken {
    /// Bearer token value.
    #[serde(rename = "iamToken")]
    pub token: String,
    /// When the token stops being accepted.
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<Timestamp>,
}

impl std::fmt::Debug for IamToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    yandex_passport_oauth_token: &'a str,
}

/// Exchanges OAuth tokens for IAM tokens.
#[derive(Debug, Clone)]
pub struct IamClient {
    http: Client,
    url: Url,
}

impl IamClient {
    /// Creates a new exchange client.
    pub fn new(config: &IamConfig, http: &HttpConfig) -> Result<Self> {
        let client = build_client(http, &Egress::Direct)?;
        Ok(Self::with_http_client(config.iam_url.clone(), client))
    }

    /// Creates an exchange client around an existing `reqwest` client.
    pub fn with_http_client(url: Url, http: Client) -> Self {
        Self { http, url }
    }

    /// Trades `oauth_token` for a fresh IAM token.
    pub async fn exchange(&self, oauth_token: &str, cancel: &CancellationToken) -> Result<IamToken> {
        if oauth_token.trim().is_empty() {
            return Err(Error::auth_or_config().with_message("OAuth token is not set"));
        }

        let request = self.http.post(self.url.clone()).json(&ExchangeRequest {
            yandex_passport_oauth_token: oauth_token,
        });
        let response = send(request, "IAM token request", cancel).await?;
        let (status, body) = read_body(response, "IAM token response", cancel).await?;

        if status != StatusCode::OK {
            return Err(Error::remote_service()
                .with_status(status.as_u16())
                .with_message(format!(
                    "IAM token exchange failed: status {}, body: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body)
                )));
        }

        let token: IamToken = serde_json::from_slice(&body).map_err(|e| {
            Error::parse()
                .with_message("failed to decode IAM token response")
                .with_source(e)
        })?;

        if token.token.is_empty() {
            return Err(Error::parse().with_message("IAM token response has no token"));
        }

        tracing::debug!(
            target: TRACING_TARGET_IAM,
            expires_at = ?token.expires_at,
            "IAM token obtained"
        );

        Ok(token)
    }
}

/// Retry and scheduling rules for [`TokenRefresher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Exchange attempts per refresh, at least one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; grows linearly.
    pub backoff: Duration,
    /// Delay between successful refreshes.
    pub interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from(&IamConfig::default())
    }
}

impl From<&IamConfig> for RefreshPolicy {
    fn from(config: &IamConfig) -> Self {
        Self {
            max_attempts: config.refresh_attempts.max(1),
            backoff: config.refresh_backoff(),
            interval: config.refresh_interval(),
        }
    }
}

impl RefreshPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// A token cell shared between the refresher and its readers.
#[derive(Debug, Clone, Default)]
pub struct SharedToken(Arc<RwLock<Option<IamToken>>>);

impl SharedToken {
    /// Returns the current token value, if one has been obtained.
    pub async fn get(&self) -> Option<String> {
        self.0.read().await.as_ref().map(|t| t.token.clone())
    }

    async fn set(&self, token: IamToken) {
        *self.0.write().await = Some(token);
    }
}

/// Keeps an IAM token fresh.
///
/// Each refresh makes at most [`RefreshPolicy::max_attempts`] exchange
/// attempts and reports an error once they are used up.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    client: IamClient,
    oauth_token: String,
    policy: RefreshPolicy,
    token: SharedToken,
}

impl TokenRefresher {
    /// Creates a refresher for `oauth_token`.
    pub fn new(client: IamClient, oauth_token: impl Into<String>, policy: RefreshPolicy) -> Self {
        Self {
            client,
            oauth_token: oauth_token.into(),
            policy,
            token: SharedToken::default(),
        }
    }

    /// Returns a handle to the refreshed token.
    pub fn token(&self) -> SharedToken {
        self.token.clone()
    }

    /// Obtains a new token, retrying failed exchanges with linear backoff.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<IamToken> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.client.exchange(&self.oauth_token, cancel).await {
                Ok(token) => {
                    self.token.set(token.clone()).await;
                    tracing::info!(
                        target: TRACING_TARGET_IAM,
                        attempt,
                        expires_at = ?token.expires_at,
                        "IAM token refreshed"
                    );
                    return Ok(token);
                }
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => error,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    target: TRACING_TARGET_IAM,
                    attempts = attempt,
                    error = %error,
                    "IAM token refresh failed permanently"
                );
                return Err(Error::new(error.kind())
                    .with_message(format!(
                        "IAM token refresh failed after {attempt} attempts"
                    ))
                    .with_source(error));
            }

            let backoff = self.policy.backoff_after(attempt);
            tracing::warn!(
                target: TRACING_TARGET_IAM,
                attempt,
                max_attempts,
                backoff_ms = backoff.as_millis(),
                error = %error,
                "IAM token refresh failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::cancelled()),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    /// Refreshes immediately and then once per interval until cancelled.
    ///
    /// Returns `Ok(())` on cancellation and the refresh error when a refresh
    /// runs out of attempts.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_IAM,
            interval_secs = self.policy.interval.as_secs(),
            "IAM token refresher started"
        );

        loop {
            match self.refresh(&cancel).await {
                Ok(_) => {}
                Err(error) if error.is_cancelled() => break,
                Err(error) => return Err(error),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        tracing::info!(target: TRACING_TARGET_IAM, "IAM token refresher stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use handscribe_core::ErrorKind;

    use super::*;

    /// Fails the first `failures` requests with 503, then issues tokens.
    async fn spawn_server(failures: u32) -> (Url, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/iam/v1/tokens",
            post(move |payload: String| {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
                    assert_eq!(json["yandexPassportOauthToken"], "oauth");
                    if n <= failures {
                        (StatusCode::SERVICE_UNAVAILABLE, "busy".to_owned())
                    } else {
                        (
                            StatusCode::OK,
                            format!(
                                r#"{{"iamToken":"t1.token-{n}","expiresAt":"2030-01-01T00:00:00Z"}}"#
                            ),
                        )
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}/iam/v1/tokens")).unwrap();
        (url, hits)
    }

    fn policy(max_attempts: u32) -> RefreshPolicy {
        RefreshPolicy {
            max_attempts,
            backoff: Duration::from_millis(5),
            interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_exchange_parses_token() {
        let (url, _) = spawn_server(0).await;
        let client = IamClient::with_http_client(url, Client::new());

        let token = client
            .exchange("oauth", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(token.token, "t1.token-1");
        assert_eq!(
            token.expires_at,
            Some("2030-01-01T00:00:00Z".parse().unwrap())
        );
        assert!(!format!("{token:?}").contains("t1.token"));
    }

    #[tokio::test]
    async fn test_exchange_requires_ok_status() {
        let router = Router::new().route(
            "/iam/v1/tokens",
            post(|| async {
                (
                    StatusCode::ACCEPTED,
                    r#"{"iamToken":"t1.pending","expiresAt":"2030-01-01T00:00:00Z"}"#,
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let url = Url::parse(&format!("http://{addr}/iam/v1/tokens")).unwrap();
        let client = IamClient::with_http_client(url, Client::new());

        let error = client
            .exchange("oauth", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RemoteService);
        assert_eq!(error.status(), Some(202));
    }

    #[tokio::test]
    async fn test_exchange_rejects_empty_oauth_token() {
        let (url, hits) = spawn_server(0).await;
        let client = IamClient::with_http_client(url, Client::new());

        let error = client
            .exchange("", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AuthOrConfig);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_retries_then_succeeds() {
        let (url, hits) = spawn_server(2).await;
        let refresher = TokenRefresher::new(
            IamClient::with_http_client(url, Client::new()),
            "oauth",
            policy(3),
        );

        let token = refresher.refresh(&CancellationToken::new()).await.unwrap();

        assert_eq!(token.token, "t1.token-3");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(refresher.token().get().await.as_deref(), Some("t1.token-3"));
    }

    #[tokio::test]
    async fn test_refresh_gives_up_after_max_attempts() {
        let (url, hits) = spawn_server(u32::MAX).await;
        let refresher = TokenRefresher::new(
            IamClient::with_http_client(url, Client::new()),
            "oauth",
            policy(2),
        );

        let error = refresher
            .refresh(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RemoteService);
        assert!(error.message().unwrap().contains("after 2 attempts"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(refresher.token().get().await.is_none());
    }

    #[tokio::test]
    async fn test_run_refreshes_until_cancelled() {
        let (url, hits) = spawn_server(0).await;
        let refresher = TokenRefresher::new(
            IamClient::with_http_client(url, Client::new()),
            "oauth",
            policy(1),
        );
        let cancel = CancellationToken::new();

        let task = {
            let refresher = refresher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { refresher.run(cancel).await })
        };

        while hits.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        assert!(task.await.unwrap().is_ok());
        assert!(refresher.token().get().await.is_some());
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = policy(5);
        assert_eq!(policy.backoff_after(1), Duration::from_millis(5));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(10));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(15));
    }
}

//! Resolves the bearer token used for recognition.

use anyhow::Context;
use handscribe_core::CancellationToken;
use handscribe_reqwest::HttpConfig;
use handscribe_yandex::{IamClient, IamConfig, RefreshPolicy, SharedToken, TokenRefresher};

use crate::TRACING_TARGET_AUTH;
use crate::config::CredentialsConfig;

/// Source of the IAM token handed to each pipeline run.
#[derive(Clone)]
pub enum AuthToken {
    /// Token given on the command line or in the environment.
    Static(String),
    /// Token kept fresh by a background [`TokenRefresher`].
    Refreshed(SharedToken),
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("AuthToken::Static"),
            Self::Refreshed(_) => f.write_str("AuthToken::Refreshed"),
        }
    }
}

impl AuthToken {
    /// Returns the current token, empty when none has been obtained.
    pub async fn current(&self) -> String {
        match self {
            Self::Static(token) => token.clone(),
            Self::Refreshed(shared) => shared.get().await.unwrap_or_default(),
        }
    }
}

/// Picks a static IAM token when one is configured, otherwise exchanges the
/// OAuth token and keeps refreshing it until `cancel` fires.
pub async fn resolve(
    credentials: &CredentialsConfig,
    iam: &IamConfig,
    http: &HttpConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<AuthToken> {
    if let Some(token) = credentials.iam_token() {
        tracing::debug!(target: TRACING_TARGET_AUTH, "Using static IAM token");
        return Ok(AuthToken::Static(token.to_owned()));
    }

    let oauth_token = iam
        .oauth_token()
        .context("neither IAM_TOKEN nor YANDEX_OAUTH is set")?;

    let client = IamClient::new(iam, http).context("failed to create IAM client")?;
    let policy = RefreshPolicy::from(iam);
    let interval = policy.interval;
    let refresher = TokenRefresher::new(client, oauth_token, policy);

    refresher
        .refresh(cancel)
        .await
        .context("failed to obtain IAM token")?;

    let shared = refresher.token();
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        if let Err(error) = refresher.run(cancel).await {
            tracing::error!(
                target: TRACING_TARGET_AUTH,
                error = %error,
                "IAM token refresher stopped"
            );
        }
    });

    Ok(AuthToken::Refreshed(shared))
}

//! Per-run credentials for the remote services.

use anyhow::bail;
use clap::Args;
use serde::{Deserialize, Serialize};

/// Credentials passed to every pipeline run.
///
/// Secrets are never serialized and never logged.
#[derive(Clone, Default, Serialize, Deserialize, Args)]
pub struct CredentialsConfig {
    /// Cloud folder the recognition calls are billed to
    #[arg(long = "folder-id", env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// IAM token for the recognition service (takes precedence over YANDEX_OAUTH)
    #[arg(long = "iam-token", env = "IAM_TOKEN", hide_env_values = true)]
    #[serde(default, skip_serializing)]
    pub iam_token: Option<String>,

    /// API key for the correction service
    #[arg(long = "mistral-api-key", env = "MISTRAL_API_KEY", hide_env_values = true)]
    #[serde(default, skip_serializing)]
    pub mistral_api_key: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("folder_id", &self.folder_id)
            .field("iam_token", &self.iam_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "mistral_api_key",
                &self.mistral_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl CredentialsConfig {
    /// Returns the folder ID, treating an empty value as absent.
    pub fn folder_id(&self) -> Option<&str> {
        non_empty(&self.folder_id)
    }

    /// Returns the static IAM token, treating an empty value as absent.
    pub fn iam_token(&self) -> Option<&str> {
        non_empty(&self.iam_token)
    }

    /// Returns the correction API key, treating an empty value as absent.
    pub fn mistral_api_key(&self) -> Option<&str> {
        non_empty(&self.mistral_api_key)
    }

    /// Checks that the credentials every run needs are present.
    ///
    /// The IAM token is resolved separately since it may come from an OAuth
    /// exchange.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.folder_id().is_none() {
            bail!("FOLDER_ID is not set");
        }
        if self.mistral_api_key().is_none() {
            bail!("MISTRAL_API_KEY is not set");
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> CredentialsConfig {
        CredentialsConfig {
            folder_id: Some("b1g-folder".to_owned()),
            iam_token: Some("t1.secret".to_owned()),
            mistral_api_key: Some("mistral-secret".to_owned()),
        }
    }

    #[test]
    fn test_validate_requires_folder_and_key() {
        assert!(complete().validate().is_ok());

        let mut missing_folder = complete();
        missing_folder.folder_id = Some("  ".to_owned());
        let err = missing_folder.validate().unwrap_err();
        assert!(err.to_string().contains("FOLDER_ID"));

        let mut missing_key = complete();
        missing_key.mistral_api_key = None;
        let err = missing_key.validate().unwrap_err();
        assert!(err.to_string().contains("MISTRAL_API_KEY"));
    }

    #[test]
    fn test_iam_token_is_optional() {
        let mut config = complete();
        config.iam_token = Some(String::new());
        assert!(config.validate().is_ok());
        assert_eq!(config.iam_token(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", complete());
        assert!(debug.contains("b1g-folder"));
        assert!(!debug.contains("t1.secret"));
        assert!(!debug.contains("mistral-secret"));
    }
}

//! Best-effort lookup of the public IP address seen by a remote service.

use std::sync::Arc;

use handscribe_core::{AppendLog, CancellationToken};
use reqwest::Client;
use url::Url;

use crate::{Egress, TRACING_TARGET_PROBE, read_body, send};

/// Default IP echo service.
pub const DEFAULT_IP_CHECK_URL: &str = "https://api.ipify.org?format=text";

/// Result of a single IP lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// The address reported by the echo service.
    pub ip: Option<String>,
    /// Why the lookup failed, if it did.
    pub error: Option<String>,
}

impl ProbeReport {
    fn log_line(&self, egress: &Egress) -> String {
        format!(
            "Proxy: {}, ProxyAddr: {}, IP: {}, Error: {}",
            egress.is_proxied(),
            egress.address(),
            self.ip.as_deref().unwrap_or("none"),
            self.error.as_deref().unwrap_or("none"),
        )
    }
}

/// Asks an IP echo service which address outbound traffic appears from and
/// records the answer in a proxy-check log.
///
/// Nothing here ever fails the caller: lookup and log errors are reported
/// through tracing and the returned [`ProbeReport`].
#[derive(Debug, Clone)]
pub struct IpProbe {
    url: Url,
    log: Option<Arc<AppendLog>>,
}

impl IpProbe {
    /// Creates a probe querying `url` and appending to `log`.
    pub fn new(url: Url, log: Option<Arc<AppendLog>>) -> Self {
        Self { url, log }
    }

    /// Returns the echo service URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Looks up the public address through `client`.
    pub async fn check(
        &self,
        client: &Client,
        egress: &Egress,
        cancel: &CancellationToken,
    ) -> ProbeReport {
        let report = match self.lookup(client, cancel).await {
            Ok(ip) => {
                tracing::info!(
                    target: TRACING_TARGET_PROBE,
                    ip = %ip,
                    proxied = egress.is_proxied(),
                    "Outbound address resolved"
                );
                ProbeReport {
                    ip: Some(ip),
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_PROBE,
                    error = %err,
                    proxied = egress.is_proxied(),
                    "Outbound address lookup failed"
                );
                ProbeReport {
                    ip: None,
                    error: Some(err),
                }
            }
        };

        if let Some(log) = &self.log
            && let Err(err) = log.append_stamped(&report.log_line(egress)).await
        {
            tracing::warn!(
                target: TRACING_TARGET_PROBE,
                path = %log.path().display(),
                error = %err,
                "Failed to write proxy check log"
            );
        }

        report
    }

    async fn lookup(&self, client: &Client, cancel: &CancellationToken) -> Result<String, String> {
        let request = client.get(self.url.clone());
        let response = send(request, "ip lookup", cancel)
            .await
            .map_err(|e| e.to_string())?;
        let (status, body) = read_body(response, "ip lookup", cancel)
            .await
            .map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(format!("unexpected status {}", status.as_u16()));
        }

        let ip = String::from_utf8_lossy(&body).trim().to_owned();
        if ip.is_empty() {
            return Err("empty response".to_owned());
        }
        Ok(ip)
    }
}

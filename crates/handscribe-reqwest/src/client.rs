//! Construction of configured `reqwest` clients.

use handscribe_core::{Error, Result};
use reqwest::{Client, Proxy};

use crate::{Egress, HttpConfig, TRACING_TARGET_CLIENT};

/// Builds an HTTP client honoring the timeout, user agent and egress strategy.
pub fn build_client(config: &HttpConfig, egress: &Egress) -> Result<Client> {
    let timeout = config.effective_timeout();
    let user_agent = config.effective_user_agent();

    let mut builder = Client::builder().timeout(timeout).user_agent(&user_agent);

    if let Some(proxy_url) = egress.proxy_url() {
        let proxy = Proxy::all(&proxy_url).map_err(|e| {
            Error::auth_or_config()
                .with_message(format!("invalid proxy '{}'", egress.address()))
                .with_source(e)
        })?;
        builder = builder.proxy(proxy);
    } else {
        builder = builder.no_proxy();
    }

    let client = builder.build().map_err(|e| {
        Error::auth_or_config()
            .with_message("failed to build HTTP client")
            .with_source(e)
    })?;

    tracing::debug!(
        target: TRACING_TARGET_CLIENT,
        timeout_ms = timeout.as_millis(),
        proxied = egress.is_proxied(),
        proxy_addr = egress.address(),
        "HTTP client created"
    );

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_direct_client() {
        assert!(build_client(&HttpConfig::default(), &Egress::Direct).is_ok());
    }

    #[test]
    fn test_build_proxied_client() {
        let egress = Egress::Socks5("127.0.0.1:10808".to_owned());
        assert!(build_client(&HttpConfig::new(5), &egress).is_ok());
    }
}

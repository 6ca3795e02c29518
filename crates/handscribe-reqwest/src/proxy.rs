//! Outbound proxy selection.

#[cfg(feature = "config")]
use clap::Args;
use handscribe_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default SOCKS5 proxy address.
pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:10808";

/// Proxy settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ProxyConfig {
    /// Route outbound correction traffic through a SOCKS5 proxy
    #[cfg_attr(
        feature = "config",
        arg(
            long = "use-proxy",
            env = "USE_PROXY",
            default_value_t = false,
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default)]
    pub use_proxy: bool,

    /// SOCKS5 proxy address as host:port
    #[cfg_attr(
        feature = "config",
        arg(long = "proxy-addr", env = "PROXY_ADDR", default_value = DEFAULT_PROXY_ADDR)
    )]
    #[serde(default = "default_proxy_addr")]
    pub proxy_addr: String,
}

fn default_proxy_addr() -> String {
    DEFAULT_PROXY_ADDR.to_owned()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            use_proxy: false,
            proxy_addr: default_proxy_addr(),
        }
    }
}

impl ProxyConfig {
    /// Proxy routing through `addr`.
    pub fn socks5(addr: impl Into<String>) -> Self {
        Self {
            use_proxy: true,
            proxy_addr: addr.into(),
        }
    }

    /// Checks that an enabled proxy has a usable `host:port` address.
    pub fn validate(&self) -> Result<()> {
        if !self.use_proxy {
            return Ok(());
        }

        let valid = self
            .proxy_addr
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());

        if valid {
            Ok(())
        } else {
            Err(Error::auth_or_config().with_message(format!(
                "invalid proxy address '{}', expected host:port",
                self.proxy_addr
            )))
        }
    }

    /// Returns the egress strategy described by this configuration.
    pub fn egress(&self) -> Egress {
        if self.use_proxy {
            Egress::Socks5(self.proxy_addr.clone())
        } else {
            Egress::Direct
        }
    }
}

/// How outbound requests reach the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Egress {
    /// Connect directly.
    #[default]
    Direct,
    /// Tunnel through a SOCKS5 proxy at `host:port`; hostnames resolve on the proxy.
    Socks5(String),
}

impl Egress {
    /// Returns the proxy URL, or `None` for direct egress.
    pub fn proxy_url(&self) -> Option<String> {
        match self {
            Self::Direct => None,
            Self::Socks5(addr) => Some(format!("socks5h://{addr}")),
        }
    }

    /// Returns true when traffic goes through a proxy.
    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::Socks5(_))
    }

    /// Returns the proxy address, or an empty string for direct egress.
    pub fn address(&self) -> &str {
        match self {
            Self::Direct => "",
            Self::Socks5(addr) => addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_direct() {
        let config = ProxyConfig::default();
        assert_eq!(config.proxy_addr, "127.0.0.1:10808");
        assert_eq!(config.egress(), Egress::Direct);
        assert!(config.egress().proxy_url().is_none());
    }

    #[test]
    fn test_enabled_proxy_uses_socks5() {
        let egress = ProxyConfig::socks5("10.0.0.2:1080").egress();
        assert!(egress.is_proxied());
        assert_eq!(egress.address(), "10.0.0.2:1080");
        assert_eq!(egress.proxy_url().as_deref(), Some("socks5h://10.0.0.2:1080"));
    }

    #[test]
    fn test_validate_rejects_bad_addresses() {
        assert!(ProxyConfig::socks5("127.0.0.1:10808").validate().is_ok());
        assert!(ProxyConfig::socks5("localhost").validate().is_err());
        assert!(ProxyConfig::socks5(":1080").validate().is_err());
        assert!(ProxyConfig::socks5("host:port").validate().is_err());

        let disabled = ProxyConfig {
            use_proxy: false,
            proxy_addr: String::new(),
        };
        assert!(disabled.validate().is_ok());
    }
}

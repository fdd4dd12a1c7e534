//! Outbound connection implementations.
//!
//! Two ways out of the bridge:
//! - `Direct`: plain TCP connection to the target
//! - `Socks5`: connection tunneled through the upstream SOCKS5 proxy
//!
//! `Connector` picks between them per request, based on the filter verdict.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::Result;
use crate::filter::Verdict;

mod direct;
pub mod socks5;

pub use direct::Direct;
pub use socks5::Socks5;

/// Default dialer timeout
pub const DEFAULT_DIALER_TIMEOUT: Duration = Duration::from_secs(10);

/// Network address of a proxy target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addr {
    /// Hostname or IP address, never carrying a port fragment
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Addr {
    /// Create a new Addr
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Outbound connection interface.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Establish a TCP connection to the given target.
    async fn dial(&self, target: &Addr) -> Result<TcpStream>;
}

/// Per-request chooser between the direct and proxied outbounds.
///
/// There is no fallback: a failed SOCKS5 leg surfaces its error rather than
/// silently retrying direct.
pub struct Connector {
    direct: Direct,
    socks5: Socks5,
}

impl Connector {
    /// Create a connector for the given upstream SOCKS5 server.
    pub fn new(socks5_addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            direct: Direct::new().with_timeout(timeout),
            socks5: Socks5::new(socks5_addr).with_timeout(timeout),
        }
    }

    /// Obtain an upstream socket for the target, honoring the verdict.
    pub async fn connect(&self, target: &Addr, verdict: Verdict) -> Result<TcpStream> {
        match verdict {
            Verdict::Direct => self.direct.dial(target).await,
            Verdict::Proxy => self.socks5.dial(target).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_display() {
        let addr = Addr::new("example.com", 443);
        assert_eq!(format!("{}", addr), "example.com:443");
    }

    #[test]
    fn test_addr_new_basic() {
        let addr = Addr::new("example.com", 80);
        assert_eq!(addr.host, "example.com");
        assert_eq!(addr.port, 80);
    }

    #[tokio::test]
    async fn test_connector_direct_verdict_skips_proxy() {
        // The SOCKS5 address is unroutable; a Direct verdict must never
        // touch it.
        let origin = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_addr = origin.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = origin.accept().await;
        });

        let connector = Connector::new("127.0.0.1:1", Duration::from_secs(1));
        let target = Addr::new("127.0.0.1", origin_addr.port());
        let stream = connector.connect(&target, Verdict::Direct).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), origin_addr);
    }

    #[tokio::test]
    async fn test_connector_proxy_verdict_no_silent_fallback() {
        // Even with a reachable target, a Proxy verdict against a dead
        // SOCKS5 server must fail instead of falling back to direct.
        let origin = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_addr = origin.local_addr().unwrap();

        let connector = Connector::new("127.0.0.1:1", Duration::from_secs(1));
        let target = Addr::new("127.0.0.1", origin_addr.port());
        let result = connector.connect(&target, Verdict::Proxy).await;
        assert!(result.is_err());
    }
}

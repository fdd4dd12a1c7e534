//! Direct outbound connection implementation.
//!
//! Connects straight to the target using the system resolver.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{Result, S2hError};

use super::{Addr, Outbound, DEFAULT_DIALER_TIMEOUT};

/// Direct outbound that connects to the target without any proxy hop.
#[derive(Debug, Clone)]
pub struct Direct {
    timeout: Duration,
}

impl Direct {
    /// Create a new Direct outbound with the default timeout.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_DIALER_TIMEOUT,
        }
    }

    /// Set connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for Direct {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Outbound for Direct {
    async fn dial(&self, target: &Addr) -> Result<TcpStream> {
        let stream = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|_| S2hError::Timeout(self.timeout))?
        .map_err(|e| S2hError::Dial {
            addr: target.to_string(),
            source: e,
        })?;

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_direct_dial() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let direct = Direct::new();
        let target = Addr::new("127.0.0.1", addr.port());
        let stream = direct.dial(&target).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_direct_dial_connection_refused() {
        // Port 1 on loopback is essentially never listening.
        let direct = Direct::new().with_timeout(Duration::from_secs(2));
        let target = Addr::new("127.0.0.1", 1);
        let err = direct.dial(&target).await.unwrap_err();
        assert!(matches!(
            err,
            S2hError::Dial { .. } | S2hError::Timeout(_)
        ));
    }
}

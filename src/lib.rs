//! s2h - expose an upstream SOCKS5 proxy as a local HTTP proxy
//!
//! This library implements the connection bridge behind the `s2h` binary:
//! - HTTP proxy dispatcher (CONNECT and absolute-URI request forms)
//! - Regex hostname filters deciding proxy-vs-direct per request
//! - SOCKS5 client handshake (RFC 1928, no-auth, CONNECT command)
//! - Bidirectional relay with half-close propagation
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use s2h::{FilterSet, Server};
//!
//! #[tokio::main]
//! async fn main() -> s2h::Result<()> {
//!     // Hosts matching a filter go through the SOCKS5 proxy, everything
//!     // else connects directly. An empty set proxies everything.
//!     let filters = FilterSet::from_lines("internal\\.example\n^10\\.")?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8081").await?;
//!     Server::new("127.0.0.1:1080", filters, Duration::from_secs(10))
//!         .run(listener)
//!         .await
//! }
//! ```

pub mod error;
pub mod filter;
pub mod outbound;
pub mod relay;
pub mod request;
pub mod server;

// Re-export commonly used items
pub use error::{Result, S2hError, Socks5Reply};
pub use filter::{FilterSet, Verdict};
pub use outbound::{Addr, Connector, Direct, Outbound, Socks5, DEFAULT_DIALER_TIMEOUT};
pub use request::{strip_port, ProxyRequest};
pub use server::Server;

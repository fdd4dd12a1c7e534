//! HTTP proxy listener and per-connection dispatcher.
//!
//! Accepts each inbound proxy connection on its own task, extracts the
//! target authority, applies the filter verdict, obtains the upstream leg
//! and hands both streams to the relay. A connection's failure never affects
//! other connections or process liveness.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Result, S2hError};
use crate::filter::FilterSet;
use crate::outbound::Connector;
use crate::relay;
use crate::request::{self, ProxyRequest};

const RESPONSE_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";
const RESPONSE_BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\n\r\n";
const RESPONSE_TIMEOUT: &[u8] = b"HTTP/1.1 408 Request Timeout\r\n\r\n";
const RESPONSE_BAD_GATEWAY: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\n\r\n";

/// The connection bridge server.
///
/// Holds the read-only filter set and the per-request connector; nothing
/// else is shared between connections.
pub struct Server {
    filters: Arc<FilterSet>,
    connector: Connector,
    handshake_timeout: Duration,
}

impl Server {
    /// Create a server routing proxied requests to the given SOCKS5 server.
    pub fn new(
        socks5_addr: impl Into<String>,
        filters: FilterSet,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            filters: Arc::new(filters),
            connector: Connector::new(socks5_addr, handshake_timeout),
            handshake_timeout,
        }
    }

    /// Accept connections until the listener fails.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let server = Arc::new(self);
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = server.handle(stream, peer).await {
                    if e.is_client_error() {
                        warn!("{}: rejected: {}", peer, e);
                    } else {
                        debug!("{}: closed with error: {}", peer, e);
                    }
                }
            });
        }
    }

    /// Bridge one inbound proxy connection to its upstream.
    async fn handle(&self, mut client: TcpStream, peer: SocketAddr) -> Result<()> {
        // The head read is bounded so a peer hanging mid-request cannot pin
        // the task forever.
        let head_read = tokio::time::timeout(self.handshake_timeout, request::read_head(&mut client));
        let (head, leftover) = match head_read.await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                respond(&mut client, RESPONSE_BAD_REQUEST).await;
                return Err(e);
            }
            Err(_) => {
                respond(&mut client, RESPONSE_TIMEOUT).await;
                return Err(S2hError::Timeout(self.handshake_timeout));
            }
        };

        let request = match ProxyRequest::parse(head) {
            Ok(r) => r,
            Err(e) => {
                respond(&mut client, RESPONSE_BAD_REQUEST).await;
                return Err(e);
            }
        };

        let target = request.target().clone();
        let verdict = self.filters.decide(&target.host);
        debug!("{}: {} routed {:?}", peer, target, verdict);

        let mut upstream = match self.connector.connect(&target, verdict).await {
            Ok(s) => s,
            Err(e) => {
                respond(&mut client, RESPONSE_BAD_GATEWAY).await;
                return Err(e);
            }
        };

        match request {
            ProxyRequest::Connect { .. } => {
                client.write_all(RESPONSE_ESTABLISHED).await?;
            }
            ProxyRequest::Forward { head, .. } => {
                // Replay the consumed request line and headers verbatim.
                upstream.write_all(&head).await?;
            }
        }
        if !leftover.is_empty() {
            upstream.write_all(&leftover).await?;
        }

        let (sent, received) = relay::pipe(client, upstream).await?;
        debug!("{}: {} done, {} bytes sent, {} received", peer, target, sent, received);
        Ok(())
    }
}

/// Best-effort client-facing status line; the connection is closing anyway.
async fn respond(client: &mut TcpStream, status: &[u8]) {
    let _ = client.write_all(status).await;
    let _ = client.shutdown().await;
}

//! SOCKS5 proxy outbound implementation.
//!
//! Performs the RFC 1928 client handshake against the upstream SOCKS5 server
//! to obtain a connected, ready-to-relay socket for a target address.
//!
//! Since SOCKS5 accepts either an IP or a domain name as the target address,
//! hostname resolution is left to the proxy server.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Result, S2hError, Socks5Reply};

use super::{Addr, Outbound, DEFAULT_DIALER_TIMEOUT};

const SOCKS5_VERSION: u8 = 0x05;
const SOCKS5_AUTH_NONE: u8 = 0x00;
const SOCKS5_AUTH_NO_ACCEPTABLE: u8 = 0xFF;

const SOCKS5_CMD_CONNECT: u8 = 0x01;

const SOCKS5_ATYP_IPV4: u8 = 0x01;
const SOCKS5_ATYP_DOMAIN: u8 = 0x03;
const SOCKS5_ATYP_IPV6: u8 = 0x04;

/// SOCKS5 proxy outbound.
///
/// Authentication is not supported; only the no-auth method is offered.
pub struct Socks5 {
    /// Proxy server address
    addr: String,
    /// Dial and negotiation timeout
    timeout: Duration,
}

impl Socks5 {
    /// Create a new SOCKS5 outbound.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_DIALER_TIMEOUT,
        }
    }

    /// Set connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Outbound for Socks5 {
    async fn dial(&self, target: &Addr) -> Result<TcpStream> {
        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| S2hError::Timeout(self.timeout))?
            .map_err(|e| S2hError::Dial {
                addr: self.addr.clone(),
                source: e,
            })?;

        // The transport is dropped (closed) on any handshake failure; the
        // handshake itself performs no retries.
        tokio::time::timeout(self.timeout, handshake(&mut stream, target))
            .await
            .map_err(|_| S2hError::Timeout(self.timeout))??;

        Ok(stream)
    }
}

/// Run the SOCKS5 CONNECT handshake over an already-open transport.
///
/// On success the stream is established end to end and ready to relay. On
/// failure the caller is responsible for closing the transport.
pub async fn handshake<S>(stream: &mut S, target: &Addr) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Greeting: version 5, one supported method, no authentication.
    stream
        .write_all(&[SOCKS5_VERSION, 1, SOCKS5_AUTH_NONE])
        .await?;

    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await?;
    if method[0] != SOCKS5_VERSION {
        return Err(S2hError::Socks5Protocol(format!(
            "unexpected version in method selection: {}",
            method[0]
        )));
    }
    match method[1] {
        SOCKS5_AUTH_NONE => {}
        SOCKS5_AUTH_NO_ACCEPTABLE => {
            return Err(S2hError::Socks5Protocol(
                "server accepts no offered authentication method".to_string(),
            ));
        }
        other => {
            return Err(S2hError::Socks5Protocol(format!(
                "server chose unsupported authentication method: {:#04x}",
                other
            )));
        }
    }

    // Connect request: version, command, reserved, then the target address
    // and big-endian port.
    let (atyp, dst_addr) = encode_target(&target.host)?;
    let mut request = vec![SOCKS5_VERSION, SOCKS5_CMD_CONNECT, 0x00, atyp];
    request.extend(&dst_addr);
    request.extend(&target.port.to_be_bytes());
    stream.write_all(&request).await?;

    // Reply: version, reply code, reserved, bound address.
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    if header[0] != SOCKS5_VERSION {
        return Err(S2hError::Socks5Protocol(format!(
            "unexpected version in reply: {}",
            header[0]
        )));
    }

    let reply = Socks5Reply::from_code(header[1]);
    if !reply.is_success() {
        return Err(S2hError::Socks5Rejected(reply));
    }

    // The bound address is informational only, but it must be fully consumed
    // so relayed bytes start at the right offset.
    drain_bound_addr(stream, header[3]).await?;

    Ok(())
}

/// Encode a target host into a SOCKS5 address type tag and value.
fn encode_target(host: &str) -> Result<(u8, Vec<u8>)> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(match ip {
            IpAddr::V4(v4) => (SOCKS5_ATYP_IPV4, v4.octets().to_vec()),
            IpAddr::V6(v6) => (SOCKS5_ATYP_IPV6, v6.octets().to_vec()),
        });
    }

    let domain = host.as_bytes();
    if domain.is_empty() || domain.len() > 255 {
        return Err(S2hError::Socks5Protocol(format!(
            "domain name length {} not encodable",
            domain.len()
        )));
    }
    let mut addr = Vec::with_capacity(domain.len() + 1);
    addr.push(domain.len() as u8);
    addr.extend_from_slice(domain);
    Ok((SOCKS5_ATYP_DOMAIN, addr))
}

/// Consume the variable-length bound address and port from a reply.
async fn drain_bound_addr<S>(stream: &mut S, atyp: u8) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let addr_len = match atyp {
        SOCKS5_ATYP_IPV4 => 4,
        SOCKS5_ATYP_IPV6 => 16,
        SOCKS5_ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => {
            return Err(S2hError::Socks5Protocol(format!(
                "unknown address type in reply: {:#04x}",
                other
            )));
        }
    };

    let mut rest = vec![0u8; addr_len + 2]; // address + port
    stream.read_exact(&mut rest).await?;
    Ok(())
}

//! Inbound HTTP proxy request parsing.
//!
//! Speaks just enough HTTP to extract a target authority from either proxy
//! request shape:
//! - `CONNECT host:port HTTP/1.1` — raw tunnel request
//! - `GET http://host[:port]/path HTTP/1.1` — absolute-URI request
//!
//! For the absolute-URI shape the already-consumed head bytes are preserved
//! verbatim so they can be replayed to the upstream leg; this is a
//! transparent proxy, not a terminating one.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, S2hError};
use crate::outbound::Addr;

/// Upper bound on the request line + header block.
pub const MAX_HEAD_SIZE: usize = 16 * 1024;

/// Default port for absolute-URI requests without an explicit port.
const DEFAULT_HTTP_PORT: u16 = 80;

/// A parsed inbound proxy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRequest {
    /// `CONNECT` tunnel request. The head is drained and discarded; the
    /// client gets a `200 Connection Established` before relaying starts.
    Connect { target: Addr },
    /// Any other method with an absolute-URI target. `head` holds the raw
    /// request line and headers to replay to the upstream.
    Forward { target: Addr, head: Vec<u8> },
}

impl ProxyRequest {
    /// Target authority of the request.
    pub fn target(&self) -> &Addr {
        match self {
            ProxyRequest::Connect { target } => target,
            ProxyRequest::Forward { target, .. } => target,
        }
    }

    /// Parse a complete request head (request line + headers, including the
    /// terminating blank line).
    pub fn parse(head: Vec<u8>) -> Result<Self> {
        let line_end = find_crlf(&head)
            .ok_or_else(|| S2hError::BadRequest("missing request line".to_string()))?;
        let request_line = std::str::from_utf8(&head[..line_end])
            .map_err(|_| S2hError::BadRequest("request line is not valid UTF-8".to_string()))?;

        let mut parts = request_line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v)) => (m, t, v),
            _ => {
                return Err(S2hError::BadRequest(format!(
                    "not a proxy request line: {:?}",
                    request_line
                )))
            }
        };

        if !version.starts_with("HTTP/") {
            return Err(S2hError::BadRequest(format!(
                "unrecognized protocol version: {:?}",
                version
            )));
        }

        if method.eq_ignore_ascii_case("CONNECT") {
            // CONNECT carries a bare authority; the port is mandatory.
            let (host, port) = split_host_port(target, None)?;
            Ok(ProxyRequest::Connect {
                target: Addr::new(host, port),
            })
        } else {
            let authority = target
                .strip_prefix("http://")
                .map(|rest| rest.split('/').next().unwrap_or(rest))
                .ok_or_else(|| {
                    S2hError::BadRequest(format!(
                        "request target is not an absolute http URI: {:?}",
                        target
                    ))
                })?;
            let (host, port) = split_host_port(authority, Some(DEFAULT_HTTP_PORT))?;
            Ok(ProxyRequest::Forward {
                target: Addr::new(host, port),
                head,
            })
        }
    }
}

/// Read the request head from the client, up to and including the blank line
/// terminating the header block.
///
/// Returns the head bytes and any bytes the client sent past the blank line
/// (an eager body, for example); both must eventually reach the upstream for
/// non-CONNECT requests. Reads beyond [`MAX_HEAD_SIZE`] are rejected.
pub async fn read_head<R>(stream: &mut R) -> Result<(Vec<u8>, Vec<u8>)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        // Re-scan a little before the new bytes in case the terminator
        // straddles a chunk boundary.
        let scan_from = buf.len().saturating_sub(3);

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(S2hError::BadRequest(
                "connection closed before end of header block".to_string(),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = find_head_end(&buf[scan_from..]) {
            let head_len = scan_from + pos + 4;
            let leftover = buf.split_off(head_len);
            return Ok((buf, leftover));
        }

        if buf.len() > MAX_HEAD_SIZE {
            return Err(S2hError::BadRequest(format!(
                "header block exceeds {} bytes",
                MAX_HEAD_SIZE
            )));
        }
    }
}

/// Strip a trailing `:port` fragment from an authority, leaving the bare
/// hostname or IP literal for filter matching.
///
/// Bracketed IPv6 literals lose their brackets as well: `[::1]:8080` and
/// `[::1]` both become `::1`. An unbracketed string with more than one colon
/// is taken to be an IPv6 literal and returned unchanged.
pub fn strip_port(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
    }
    match authority.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        Some(_) => authority, // bare IPv6 literal, no port to strip
        None => authority,
    }
}

/// Split an authority into host and port.
///
/// `default` supplies the port when the authority has none; `None` makes the
/// port mandatory (the CONNECT form).
pub fn split_host_port(authority: &str, default: Option<u16>) -> Result<(String, u16)> {
    let bad = |msg: &str| S2hError::BadRequest(format!("{}: {:?}", msg, authority));

    // Bracketed IPv6 literal: [::1]:8080 or [::1]
    if let Some(rest) = authority.strip_prefix('[') {
        let end = rest.find(']').ok_or_else(|| bad("unterminated IPv6 literal"))?;
        let host = &rest[..end];
        return match &rest[end + 1..] {
            "" => default
                .map(|port| (host.to_string(), port))
                .ok_or_else(|| bad("missing port in authority")),
            tail => {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse::<u16>().ok())
                    .ok_or_else(|| bad("invalid port in authority"))?;
                Ok((host.to_string(), port))
            }
        };
    }

    match authority.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => {
            Err(bad("IPv6 literal must be bracketed in authority"))
        }
        Some((host, port)) => {
            if host.is_empty() {
                return Err(bad("missing host in authority"));
            }
            let port = port.parse::<u16>().map_err(|_| bad("invalid port in authority"))?;
            Ok((host.to_string(), port))
        }
        None => {
            if authority.is_empty() {
                return Err(bad("missing host in authority"));
            }
            default
                .map(|port| (authority.to_string(), port))
                .ok_or_else(|| bad("missing port in authority"))
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

use thiserror::Error;

/// SOCKS5 reply codes from RFC 1928 section 6.
///
/// Any value other than `Succeeded` fails the handshake with that reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks5Reply {
    Succeeded,
    GeneralFailure,
    ConnectionNotAllowed,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
    /// Reply code outside the range assigned by RFC 1928
    Unassigned(u8),
}

impl Socks5Reply {
    /// Map a wire reply code to its taxonomy entry.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Socks5Reply::Succeeded,
            0x01 => Socks5Reply::GeneralFailure,
            0x02 => Socks5Reply::ConnectionNotAllowed,
            0x03 => Socks5Reply::NetworkUnreachable,
            0x04 => Socks5Reply::HostUnreachable,
            0x05 => Socks5Reply::ConnectionRefused,
            0x06 => Socks5Reply::TtlExpired,
            0x07 => Socks5Reply::CommandNotSupported,
            0x08 => Socks5Reply::AddressTypeNotSupported,
            other => Socks5Reply::Unassigned(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Socks5Reply::Succeeded)
    }
}

impl std::fmt::Display for Socks5Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Socks5Reply::Succeeded => "succeeded",
            Socks5Reply::GeneralFailure => "general SOCKS server failure",
            Socks5Reply::ConnectionNotAllowed => "connection not allowed by ruleset",
            Socks5Reply::NetworkUnreachable => "network unreachable",
            Socks5Reply::HostUnreachable => "host unreachable",
            Socks5Reply::ConnectionRefused => "connection refused",
            Socks5Reply::TtlExpired => "TTL expired",
            Socks5Reply::CommandNotSupported => "command not supported",
            Socks5Reply::AddressTypeNotSupported => "address type not supported",
            Socks5Reply::Unassigned(code) => return write!(f, "unassigned reply code {:#04x}", code),
        };
        f.write_str(s)
    }
}

/// s2h error types
#[derive(Error, Debug)]
pub enum S2hError {
    #[error("Invalid filter pattern at line {line}: {source}")]
    InvalidPattern {
        line: usize,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read filter file '{path}': {source}")]
    FilterFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed proxy request: {0}")]
    BadRequest(String),

    #[error("Failed to connect to {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SOCKS5 request failed: {0}")]
    Socks5Rejected(Socks5Reply),

    #[error("SOCKS5 protocol error: {0}")]
    Socks5Protocol(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl S2hError {
    /// Whether this error comes from the client side of the bridge.
    ///
    /// Client-protocol errors get a 400-class response; everything that went
    /// wrong while reaching the upstream gets a 502-class response.
    pub fn is_client_error(&self) -> bool {
        matches!(self, S2hError::BadRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, S2hError>;

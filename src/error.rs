//! Error handling for the deimos scanner
//!
//! Two layers: `TransportError` covers raw-socket faults that are fatal to
//! the whole run, `ScanError` is the library-wide taxonomy. Timeouts and
//! ICMP unreachable replies are classification results, not errors, and
//! never appear here.

use thiserror::Error;

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Packet error: {0}")]
    PacketError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Faults raised by the raw-socket layer.
///
/// Opening a raw socket without the capability to do so, or a send that the
/// kernel rejects outright. The expected no-reply case is `Ok(None)` from
/// [`probe`](crate::network::transport::PacketTransport::probe), never an
/// error variant.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Send failed: {0}")]
    Send(String),
}

impl ScanError {
    /// Fatal errors abort the run before any probing; everything else is
    /// reported per probe and the scan continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidTarget(_) | ScanError::ConfigError(_) | ScanError::Transport(_)
        )
    }
}

impl From<std::net::AddrParseError> for ScanError {
    fn from(e: std::net::AddrParseError) -> Self {
        ScanError::InvalidTarget(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(ScanError::InvalidTarget("999.1.1.1".into()).is_fatal());
        assert!(ScanError::Transport(TransportError::PermissionDenied("raw socket".into())).is_fatal());
        assert!(!ScanError::PacketError("short buffer".into()).is_fatal());
    }
}

//! Network module for packet crafting and raw-socket transport

pub mod packet;
pub mod transport;

use serde::{Deserialize, Serialize};

/// Tri-state port classification from one SYN probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortState {
    Open,
    Closed,
    /// No conclusive signal: timeout, unexpected flags or a non-TCP reply.
    /// Firewall-drop and silently-ignored cases share this bucket; a SYN
    /// probe cannot tell them apart.
    Filtered,
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortState::Open => write!(f, "open"),
            PortState::Closed => write!(f, "closed"),
            PortState::Filtered => write!(f, "filtered"),
        }
    }
}

/// Host liveness classification from one ICMP echo probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostState {
    /// Echo reply (or any non-blocking reply) arrived; port scan follows.
    Responding,
    /// No reply within the timeout; the host is skipped.
    Down,
    /// Type-3 reply with a filtering code; assumed to filter TCP probes
    /// too unreliably to bother, so the host is skipped.
    BlockingIcmp,
}

impl std::fmt::Display for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostState::Responding => write!(f, "responding"),
            HostState::Down => write!(f, "down"),
            HostState::BlockingIcmp => write!(f, "blocking-icmp"),
        }
    }
}

/// Protocol carried by an outbound probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeProtocol {
    Tcp,
    Icmp,
}

impl ProbeProtocol {
    pub fn number(&self) -> u8 {
        match self {
            ProbeProtocol::Tcp => 6,
            ProbeProtocol::Icmp => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeProtocol::Tcp => "tcp",
            ProbeProtocol::Icmp => "icmp",
        }
    }
}

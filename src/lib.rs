//! Deimos - ICMP sweep and TCP SYN port reconnaissance
//!
//! Determines host liveness with ICMP echo probes and classifies TCP ports
//! on responding hosts as open, closed or filtered using half-open SYN probes.

pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{ScanError, TransportError};
pub use events::{Event, EventKind, EventSink, Severity};
pub use network::{HostState, PortState};
pub use scanner::engine::ScanEngine;
pub use scanner::{ProbeResult, ScanSummary};

pub type Result<T> = std::result::Result<T, ScanError>;

//! Scanner module: liveness probing, port classification and orchestration

pub mod engine;
pub mod liveness;
pub mod ports;

pub use engine::ScanEngine;
pub use liveness::LivenessProbe;
pub use ports::PortClassifier;

use serde::Serialize;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::network::{HostState, PortState};

/// Outcome of one host- or port-level check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeOutcome {
    Open,
    Closed,
    Filtered,
    HostResponding,
    HostDown,
    HostBlockingIcmp,
    Error(String),
}

impl From<PortState> for ProbeOutcome {
    fn from(state: PortState) -> Self {
        match state {
            PortState::Open => ProbeOutcome::Open,
            PortState::Closed => ProbeOutcome::Closed,
            PortState::Filtered => ProbeOutcome::Filtered,
        }
    }
}

impl From<HostState> for ProbeOutcome {
    fn from(state: HostState) -> Self {
        match state {
            HostState::Responding => ProbeOutcome::HostResponding,
            HostState::Down => ProbeOutcome::HostDown,
            HostState::BlockingIcmp => ProbeOutcome::HostBlockingIcmp,
        }
    }
}

/// Immutable record of one classification decision.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub host: Ipv4Addr,
    pub port: Option<u16>,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn host_check(host: Ipv4Addr, state: HostState) -> Self {
        Self {
            host,
            port: None,
            outcome: state.into(),
        }
    }

    pub fn port_check(host: Ipv4Addr, port: u16, state: PortState) -> Self {
        Self {
            host,
            port: Some(port),
            outcome: state.into(),
        }
    }

    pub fn error(host: Ipv4Addr, port: Option<u16>, reason: impl std::fmt::Display) -> Self {
        Self {
            host,
            port,
            outcome: ProbeOutcome::Error(reason.to_string()),
        }
    }
}

/// Aggregate returned to the caller after one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub target: String,
    pub hosts_evaluated: usize,
    pub hosts_responding: usize,
    #[serde(skip)]
    pub duration: Duration,
    pub cancelled: bool,
}

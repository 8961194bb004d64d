//! ICMP liveness probing
//!
//! One echo request per host decides whether a port scan is worth running.
//! A type-3 reply carrying one of the configured filtering codes marks the
//! host as actively blocking ICMP; such hosts are assumed to filter TCP
//! probes too unreliably to bother, and are skipped.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::network::packet::IcmpEchoBuilder;
use crate::network::transport::{PacketTransport, ProbeReply};
use crate::network::HostState;

pub struct LivenessProbe<'a, T: PacketTransport> {
    transport: &'a T,
    timeout: Duration,
    blocking_codes: &'a [u8],
}

impl<'a, T: PacketTransport> LivenessProbe<'a, T> {
    pub fn new(transport: &'a T, timeout: Duration, blocking_codes: &'a [u8]) -> Self {
        Self {
            transport,
            timeout,
            blocking_codes,
        }
    }

    /// Classify one host from a single echo request.
    pub async fn check(&self, target: Ipv4Addr) -> crate::Result<HostState> {
        let probe = IcmpEchoBuilder::new(target).probe();

        match self.transport.probe(&probe, self.timeout).await? {
            None => Ok(HostState::Down),
            Some(ProbeReply::Icmp(reply))
                if reply.is_destination_unreachable()
                    && self.blocking_codes.contains(&reply.icmp_code) =>
            {
                Ok(HostState::BlockingIcmp)
            }
            Some(_) => Ok(HostState::Responding),
        }
    }
}

//! TCP SYN port classification
//!
//! Half-open probing: one SYN per (host, port), classified from the first
//! matching reply. An opened handshake is immediately torn down with a RST
//! so no half-open state lingers on the target.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::network::packet::TcpPacketBuilder;
use crate::network::transport::{PacketTransport, ProbeReply};
use crate::network::PortState;
use crate::utils;

pub struct PortClassifier<'a, T: PacketTransport> {
    transport: &'a T,
    source_ip: Ipv4Addr,
    timeout: Duration,
}

impl<'a, T: PacketTransport> PortClassifier<'a, T> {
    pub fn new(transport: &'a T, source_ip: Ipv4Addr, timeout: Duration) -> Self {
        Self {
            transport,
            source_ip,
            timeout,
        }
    }

    /// Classify one port from a single SYN probe.
    ///
    /// SYN+ACK means open, RST+ACK means closed; any other reply shares the
    /// filtered bucket with the timeout case, since this probe cannot tell a
    /// firewall drop from a silent ignore.
    pub async fn classify(&self, target: Ipv4Addr, port: u16) -> crate::Result<PortState> {
        let source_port = utils::random_source_port();
        let syn = TcpPacketBuilder::new(self.source_ip, target, source_port, port)
            .syn()
            .probe();

        match self.transport.probe(&syn, self.timeout).await? {
            Some(ProbeReply::Tcp(reply)) if reply.is_syn_ack() => {
                // Tear down the half-open connection the SYN elicited;
                // fire-and-forget, the classification stands either way
                let rst = TcpPacketBuilder::new(self.source_ip, target, source_port, port)
                    .rst()
                    .seq_num(reply.ack_num)
                    .probe();
                if let Err(e) = self.transport.send(&rst).await {
                    log::debug!("rst teardown to {}:{} failed: {}", target, port, e);
                }
                Ok(PortState::Open)
            }
            Some(ProbeReply::Tcp(reply)) if reply.is_rst_ack() => Ok(PortState::Closed),
            Some(_) => Ok(PortState::Filtered),
            None => Ok(PortState::Filtered),
        }
    }
}

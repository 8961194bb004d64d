//! Raw-socket transport
//!
//! One probe on the wire, at most one matching reply back. The transport
//! owns no per-probe state; scan workers each hold their own instance so no
//! socket is shared across tasks.

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::timeout;

use super::packet::{IcmpReply, OutboundProbe, PacketParser, TcpReply};
use super::ProbeProtocol;
use crate::error::TransportError;

const RECV_BUFFER_LEN: usize = 1500;
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reply matched back to an outbound probe.
#[derive(Debug, Clone)]
pub enum ProbeReply {
    Tcp(TcpReply),
    Icmp(IcmpReply),
}

/// Send/receive primitive the probing engine is built on.
///
/// `probe` returns `Ok(None)` when nothing matching came back within the
/// timeout; that is the normal outcome against filtered targets, not a
/// fault. Errors are reserved for the socket layer itself.
#[async_trait]
pub trait PacketTransport: Send + Sync {
    /// Send one crafted packet and wait up to `timeout` for the first reply
    /// whose source address and protocol match the probe.
    async fn probe(
        &self,
        probe: &OutboundProbe,
        timeout: Duration,
    ) -> Result<Option<ProbeReply>, TransportError>;

    /// Fire-and-forget transmission; no reply is awaited.
    async fn send(&self, probe: &OutboundProbe) -> Result<(), TransportError>;
}

/// Builds one transport per scan worker.
pub trait TransportFactory: Send + Sync {
    type Transport: PacketTransport + 'static;

    fn create(&self) -> Result<Self::Transport, TransportError>;
}

/// Production transport over raw IPv4 sockets, one per protocol.
pub struct RawSocketTransport {
    tcp: Socket,
    icmp: Socket,
}

impl RawSocketTransport {
    pub fn new() -> Result<Self, TransportError> {
        let tcp = open_raw(Protocol::TCP)?;
        // The TCP builder emits a full IPv4 frame
        tcp.set_header_included(true)
            .map_err(|e| TransportError::Socket(e.to_string()))?;
        let icmp = open_raw(Protocol::ICMPV4)?;

        Ok(Self { tcp, icmp })
    }

    fn socket_for(&self, protocol: ProbeProtocol) -> &Socket {
        match protocol {
            ProbeProtocol::Tcp => &self.tcp,
            ProbeProtocol::Icmp => &self.icmp,
        }
    }

    /// First reply wins; everything else on the socket is ignored.
    fn match_reply(probe: &OutboundProbe, frame: &[u8]) -> Option<ProbeReply> {
        match probe.protocol {
            ProbeProtocol::Tcp => {
                let reply = PacketParser::parse_tcp_reply(frame)?;
                let ports_echo = Some(reply.source_port) == probe.dest_port
                    && Some(reply.dest_port) == probe.source_port;
                (reply.source_ip == probe.destination && ports_echo)
                    .then(|| ProbeReply::Tcp(reply))
            }
            ProbeProtocol::Icmp => {
                let reply = PacketParser::parse_icmp_reply(frame)?;
                (reply.source_ip == probe.destination).then(|| ProbeReply::Icmp(reply))
            }
        }
    }

    fn transmit(&self, probe: &OutboundProbe) -> Result<(), TransportError> {
        let dest = SocketAddr::new(IpAddr::V4(probe.destination), 0);
        self.socket_for(probe.protocol)
            .send_to(&probe.packet, &dest.into())
            .map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(())
    }

    async fn recv_matching(&self, probe: &OutboundProbe) -> Result<ProbeReply, io::Error> {
        let socket = self.socket_for(probe.protocol);
        let mut buf = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_LEN];

        loop {
            match socket.recv_from(&mut buf) {
                Ok((size, _addr)) => {
                    let frame: Vec<u8> = buf[..size]
                        .iter()
                        .map(|b| unsafe { b.assume_init() })
                        .collect();
                    if let Some(reply) = Self::match_reply(probe, &frame) {
                        return Ok(reply);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(RECV_POLL_INTERVAL).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl PacketTransport for RawSocketTransport {
    async fn probe(
        &self,
        probe: &OutboundProbe,
        wait: Duration,
    ) -> Result<Option<ProbeReply>, TransportError> {
        self.transmit(probe)?;

        match timeout(wait, self.recv_matching(probe)).await {
            Ok(Ok(reply)) => Ok(Some(reply)),
            Ok(Err(e)) => Err(TransportError::Socket(e.to_string())),
            // No matching reply inside the window
            Err(_elapsed) => Ok(None),
        }
    }

    async fn send(&self, probe: &OutboundProbe) -> Result<(), TransportError> {
        self.transmit(probe)
    }
}

/// Factory handing every worker its own raw-socket pair.
pub struct RawSocketFactory;

impl TransportFactory for RawSocketFactory {
    type Transport = RawSocketTransport;

    fn create(&self) -> Result<Self::Transport, TransportError> {
        RawSocketTransport::new()
    }
}

fn open_raw(protocol: Protocol) -> Result<Socket, TransportError> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(protocol)).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            TransportError::PermissionDenied(
                "raw sockets require root or CAP_NET_RAW".to_string(),
            )
        } else {
            TransportError::Socket(e.to_string())
        }
    })?;

    socket
        .set_nonblocking(true)
        .map_err(|e| TransportError::Socket(e.to_string()))?;

    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::packet::{IcmpEchoBuilder, TcpPacketBuilder};
    use std::net::Ipv4Addr;

    fn tcp_frame(src: Ipv4Addr, dst: Ipv4Addr, sport: u16, dport: u16) -> Vec<u8> {
        TcpPacketBuilder::new(src, dst, sport, dport).syn().build()
    }

    #[test]
    fn tcp_match_requires_echoed_ports() {
        let probe = TcpPacketBuilder::new(
            Ipv4Addr::new(10, 0, 0, 9),
            Ipv4Addr::new(10, 0, 0, 5),
            40000,
            80,
        )
        .syn()
        .probe();

        // Reply from the target, ports swapped back at us
        let reply = tcp_frame(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 0, 9),
            80,
            40000,
        );
        assert!(RawSocketTransport::match_reply(&probe, &reply).is_some());

        // Same host, different connection
        let stray = tcp_frame(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 0, 9),
            443,
            40000,
        );
        assert!(RawSocketTransport::match_reply(&probe, &stray).is_none());

        // Different host entirely
        let other = tcp_frame(
            Ipv4Addr::new(10, 0, 0, 6),
            Ipv4Addr::new(10, 0, 0, 9),
            80,
            40000,
        );
        assert!(RawSocketTransport::match_reply(&probe, &other).is_none());
    }

    #[test]
    fn icmp_match_requires_probed_source() {
        let probe = IcmpEchoBuilder::new(Ipv4Addr::new(10, 0, 0, 5)).probe();

        let mut frame = vec![0u8; 28];
        {
            use pnet::packet::ipv4::MutableIpv4Packet;
            let mut ip = MutableIpv4Packet::new(&mut frame).unwrap();
            ip.set_version(4);
            ip.set_header_length(5);
            ip.set_total_length(28);
            ip.set_next_level_protocol(pnet::packet::ip::IpNextHeaderProtocols::Icmp);
            ip.set_source(Ipv4Addr::new(10, 0, 0, 5));
            ip.set_destination(Ipv4Addr::new(10, 0, 0, 9));
        }
        frame[20] = 0; // echo reply

        assert!(RawSocketTransport::match_reply(&probe, &frame).is_some());

        // A router answering for the host does not match
        {
            use pnet::packet::ipv4::MutableIpv4Packet;
            let mut ip = MutableIpv4Packet::new(&mut frame).unwrap();
            ip.set_source(Ipv4Addr::new(10, 0, 0, 1));
        }
        assert!(RawSocketTransport::match_reply(&probe, &frame).is_none());
    }

    #[test]
    fn tcp_probe_never_matches_icmp_frames() {
        let probe = TcpPacketBuilder::new(
            Ipv4Addr::new(10, 0, 0, 9),
            Ipv4Addr::new(10, 0, 0, 5),
            40000,
            80,
        )
        .syn()
        .probe();

        let echo = IcmpEchoBuilder::new(Ipv4Addr::new(10, 0, 0, 9)).build();
        assert!(RawSocketTransport::match_reply(&probe, &echo).is_none());
    }
}

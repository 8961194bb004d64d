//! Packet crafting and parsing
//!
//! Builders emit the exact bytes put on the wire (full IPv4 frame for TCP
//! probes, bare ICMP message for echo probes) together with the metadata the
//! transport needs to match replies back to the probe.

use pnet::packet::icmp::{self, IcmpPacket, IcmpTypes};
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{MutableTcpPacket, TcpFlags, TcpPacket};
use rand::Rng;
use std::net::Ipv4Addr;

use super::ProbeProtocol;

const IP_HEADER_LEN: usize = 20;
const TCP_HEADER_LEN: usize = 20;
const ICMP_ECHO_LEN: usize = 64;

/// A crafted probe ready for the wire, with reply-matching metadata.
#[derive(Debug, Clone)]
pub struct OutboundProbe {
    pub destination: Ipv4Addr,
    pub protocol: ProbeProtocol,
    /// Ephemeral source port of a TCP probe; replies must echo it back.
    pub source_port: Option<u16>,
    /// Probed TCP port; replies must originate from it.
    pub dest_port: Option<u16>,
    pub packet: Vec<u8>,
}

/// TCP segment builder over a hand-built IPv4 header
pub struct TcpPacketBuilder {
    source_ip: Ipv4Addr,
    dest_ip: Ipv4Addr,
    source_port: u16,
    dest_port: u16,
    flags: u8,
    seq_num: u32,
    ack_num: u32,
    window_size: u16,
}

impl TcpPacketBuilder {
    pub fn new(source_ip: Ipv4Addr, dest_ip: Ipv4Addr, source_port: u16, dest_port: u16) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            source_ip,
            dest_ip,
            source_port,
            dest_port,
            flags: 0,
            seq_num: rng.gen(),
            ack_num: 0,
            window_size: 65535,
        }
    }

    pub fn syn(mut self) -> Self {
        self.flags |= TcpFlags::SYN as u8;
        self
    }

    pub fn rst(mut self) -> Self {
        self.flags |= TcpFlags::RST as u8;
        self
    }

    pub fn seq_num(mut self, seq_num: u32) -> Self {
        self.seq_num = seq_num;
        self
    }

    pub fn ack_num(mut self, ack_num: u32) -> Self {
        self.ack_num = ack_num;
        self
    }

    /// Build the complete IP + TCP packet
    pub fn build(&self) -> Vec<u8> {
        let total_len = IP_HEADER_LEN + TCP_HEADER_LEN;
        let mut packet_buf = vec![0u8; total_len];

        {
            // Buffer is sized for the headers, so construction cannot fail
            let mut ip_packet = MutableIpv4Packet::new(&mut packet_buf[..IP_HEADER_LEN]).unwrap();
            ip_packet.set_version(4);
            ip_packet.set_header_length(5);
            ip_packet.set_total_length(total_len as u16);
            ip_packet.set_identification(rand::thread_rng().gen());
            ip_packet.set_flags(2); // don't fragment
            ip_packet.set_ttl(64);
            ip_packet.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
            ip_packet.set_source(self.source_ip);
            ip_packet.set_destination(self.dest_ip);

            let checksum = pnet::packet::ipv4::checksum(&ip_packet.to_immutable());
            ip_packet.set_checksum(checksum);
        }

        {
            let mut tcp_packet = MutableTcpPacket::new(&mut packet_buf[IP_HEADER_LEN..]).unwrap();
            tcp_packet.set_source(self.source_port);
            tcp_packet.set_destination(self.dest_port);
            tcp_packet.set_sequence(self.seq_num);
            tcp_packet.set_acknowledgement(self.ack_num);
            tcp_packet.set_data_offset(5);
            tcp_packet.set_flags(self.flags as u16);
            tcp_packet.set_window(self.window_size);
            tcp_packet.set_urgent_ptr(0);

            let checksum = pnet::packet::tcp::ipv4_checksum(
                &tcp_packet.to_immutable(),
                &self.source_ip,
                &self.dest_ip,
            );
            tcp_packet.set_checksum(checksum);
        }

        packet_buf
    }

    /// Build and wrap with reply-matching metadata
    pub fn probe(&self) -> OutboundProbe {
        OutboundProbe {
            destination: self.dest_ip,
            protocol: ProbeProtocol::Tcp,
            source_port: Some(self.source_port),
            dest_port: Some(self.dest_port),
            packet: self.build(),
        }
    }
}

/// ICMP echo request builder
pub struct IcmpEchoBuilder {
    dest_ip: Ipv4Addr,
    identifier: u16,
    sequence: u16,
}

impl IcmpEchoBuilder {
    pub fn new(dest_ip: Ipv4Addr) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            dest_ip,
            identifier: rng.gen(),
            sequence: rng.gen(),
        }
    }

    /// Build the bare ICMP message; the ICMP raw socket prepends the IP
    /// header itself.
    pub fn build(&self) -> Vec<u8> {
        let mut packet_buf = vec![0u8; ICMP_ECHO_LEN];

        {
            let mut echo = MutableEchoRequestPacket::new(&mut packet_buf).unwrap();
            echo.set_icmp_type(IcmpTypes::EchoRequest);
            echo.set_identifier(self.identifier);
            echo.set_sequence_number(self.sequence);
        }

        let checksum = icmp::checksum(&IcmpPacket::new(&packet_buf).unwrap());
        {
            let mut echo = MutableEchoRequestPacket::new(&mut packet_buf).unwrap();
            echo.set_checksum(checksum);
        }

        packet_buf
    }

    pub fn probe(&self) -> OutboundProbe {
        OutboundProbe {
            destination: self.dest_ip,
            protocol: ProbeProtocol::Icmp,
            source_port: None,
            dest_port: None,
            packet: self.build(),
        }
    }
}

/// Parser for received packets
pub struct PacketParser;

impl PacketParser {
    /// Parse a raw IPv4 frame carrying TCP
    pub fn parse_tcp_reply(packet: &[u8]) -> Option<TcpReply> {
        if packet.len() < IP_HEADER_LEN {
            return None;
        }

        let ip_packet = Ipv4Packet::new(packet)?;
        if ip_packet.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
            return None;
        }

        let ip_header_len = (ip_packet.get_header_length() as usize) * 4;
        let tcp_packet = TcpPacket::new(packet.get(ip_header_len..)?)?;

        Some(TcpReply {
            source_ip: ip_packet.get_source(),
            dest_ip: ip_packet.get_destination(),
            source_port: tcp_packet.get_source(),
            dest_port: tcp_packet.get_destination(),
            flags: tcp_packet.get_flags() as u8,
            seq_num: tcp_packet.get_sequence(),
            ack_num: tcp_packet.get_acknowledgement(),
        })
    }

    /// Parse a raw IPv4 frame carrying ICMP
    pub fn parse_icmp_reply(packet: &[u8]) -> Option<IcmpReply> {
        if packet.len() < IP_HEADER_LEN {
            return None;
        }

        let ip_packet = Ipv4Packet::new(packet)?;
        if ip_packet.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
            return None;
        }

        let ip_header_len = (ip_packet.get_header_length() as usize) * 4;
        let icmp_payload = packet.get(ip_header_len..)?;
        if icmp_payload.len() < 8 {
            return None;
        }

        Some(IcmpReply {
            source_ip: ip_packet.get_source(),
            dest_ip: ip_packet.get_destination(),
            icmp_type: icmp_payload[0],
            icmp_code: icmp_payload[1],
        })
    }
}

/// Parsed TCP reply
#[derive(Debug, Clone)]
pub struct TcpReply {
    pub source_ip: Ipv4Addr,
    pub dest_ip: Ipv4Addr,
    pub source_port: u16,
    pub dest_port: u16,
    pub flags: u8,
    pub seq_num: u32,
    pub ack_num: u32,
}

impl TcpReply {
    /// Exactly SYN and ACK set, nothing else.
    pub fn is_syn_ack(&self) -> bool {
        self.flags == (TcpFlags::SYN as u8 | TcpFlags::ACK as u8)
    }

    /// Exactly RST and ACK set, nothing else.
    pub fn is_rst_ack(&self) -> bool {
        self.flags == (TcpFlags::RST as u8 | TcpFlags::ACK as u8)
    }
}

/// Parsed ICMP reply
#[derive(Debug, Clone)]
pub struct IcmpReply {
    pub source_ip: Ipv4Addr,
    pub dest_ip: Ipv4Addr,
    pub icmp_type: u8,
    pub icmp_code: u8,
}

impl IcmpReply {
    pub fn is_destination_unreachable(&self) -> bool {
        self.icmp_type == 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syn_probe_sets_only_syn() {
        let builder = TcpPacketBuilder::new(
            Ipv4Addr::new(192, 168, 1, 100),
            Ipv4Addr::new(192, 168, 1, 1),
            40000,
            80,
        )
        .syn();
        let bytes = builder.build();

        let reply = PacketParser::parse_tcp_reply(&bytes).unwrap();
        assert_eq!(reply.flags, TcpFlags::SYN as u8);
        assert_eq!(reply.source_port, 40000);
        assert_eq!(reply.dest_port, 80);
        assert_eq!(reply.dest_ip, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn rst_teardown_carries_ack_num_as_sequence() {
        let bytes = TcpPacketBuilder::new(
            Ipv4Addr::new(10, 0, 0, 9),
            Ipv4Addr::new(10, 0, 0, 5),
            40001,
            443,
        )
        .rst()
        .seq_num(12345)
        .build();

        let reply = PacketParser::parse_tcp_reply(&bytes).unwrap();
        assert_eq!(reply.flags, TcpFlags::RST as u8);
        assert_eq!(reply.seq_num, 12345);
    }

    #[test]
    fn flag_helpers_require_exact_match() {
        let mut reply = TcpReply {
            source_ip: Ipv4Addr::LOCALHOST,
            dest_ip: Ipv4Addr::LOCALHOST,
            source_port: 80,
            dest_port: 40000,
            flags: TcpFlags::SYN as u8 | TcpFlags::ACK as u8,
            seq_num: 0,
            ack_num: 0,
        };
        assert!(reply.is_syn_ack());
        assert!(!reply.is_rst_ack());

        // SYN+ACK+PSH is not a handshake reply
        reply.flags |= TcpFlags::PSH as u8;
        assert!(!reply.is_syn_ack());

        reply.flags = TcpFlags::RST as u8 | TcpFlags::ACK as u8;
        assert!(reply.is_rst_ack());
    }

    #[test]
    fn icmp_echo_is_type_eight() {
        let bytes = IcmpEchoBuilder::new(Ipv4Addr::new(10, 0, 0, 5)).build();
        assert_eq!(bytes[0], 8);
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes.len(), 64);
    }

    #[test]
    fn parser_rejects_short_frames() {
        assert!(PacketParser::parse_tcp_reply(&[0u8; 12]).is_none());
        assert!(PacketParser::parse_icmp_reply(&[0u8; 12]).is_none());
    }
}

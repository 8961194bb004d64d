//! Utility modules for the scanner

pub mod target_parser;

use rand::Rng;
use std::net::{IpAddr, Ipv4Addr};

/// Random ephemeral source port for a SYN probe
pub fn random_source_port() -> u16 {
    rand::thread_rng().gen_range(32768..65535)
}

/// Best-effort local IPv4 address, determined by routing a UDP socket
/// toward a public address (nothing is sent). Falls back to the
/// unspecified address on hosts with no default route.
pub fn local_source_ip() -> Ipv4Addr {
    match routed_local_addr() {
        Ok(ip) => ip,
        Err(e) => {
            log::warn!("could not determine local address: {}", e);
            Ipv4Addr::UNSPECIFIED
        }
    }
}

fn routed_local_addr() -> std::io::Result<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;

    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(_) => Ok(Ipv4Addr::UNSPECIFIED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ports_are_ephemeral() {
        for _ in 0..64 {
            let port = random_source_port();
            assert!(port >= 32768);
        }
    }
}

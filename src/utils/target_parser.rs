//! Target parsing and host-range expansion
//!
//! A target is either one dotted IPv4 address or an IPv4 CIDR block.
//! Malformed input is rejected here, before any socket is opened.

use anyhow::{bail, ensure, Context, Result};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Ceiling on range expansion; a /16 is the widest accepted block.
const MAX_RANGE_ADDRESSES: u64 = 65536;

/// A validated scan target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSpec {
    Single(Ipv4Addr),
    Network { network: Ipv4Addr, prefix: u8 },
}

impl TargetSpec {
    /// Parse a target string, normalizing CIDR input to its network base
    /// (host bits are masked off, so `10.0.0.5/30` means `10.0.0.4/30`).
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("target cannot be empty");
        }

        let Some((addr_part, prefix_part)) = input.split_once('/') else {
            let addr = Ipv4Addr::from_str(input)
                .with_context(|| format!("invalid IPv4 address: {}", input))?;
            return Ok(TargetSpec::Single(addr));
        };

        let addr = Ipv4Addr::from_str(addr_part)
            .with_context(|| format!("invalid IPv4 address in CIDR: {}", addr_part))?;
        let prefix: u8 = prefix_part
            .parse()
            .with_context(|| format!("invalid prefix length: {}", prefix_part))?;

        ensure!(prefix <= 32, "prefix length cannot exceed 32");

        let total = 1u64 << (32 - prefix);
        ensure!(
            total <= MAX_RANGE_ADDRESSES,
            "network too large: /{} expands to {} addresses (max {})",
            prefix,
            total,
            MAX_RANGE_ADDRESSES
        );

        let mask = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        };
        let network = Ipv4Addr::from(u32::from(addr) & mask);

        Ok(TargetSpec::Network { network, prefix })
    }

    /// Usable host addresses in ascending order.
    ///
    /// For a network the network and broadcast addresses are excluded, so
    /// /31 and /32 blocks expand to no usable hosts.
    pub fn hosts(&self) -> Vec<Ipv4Addr> {
        match *self {
            TargetSpec::Single(addr) => vec![addr],
            TargetSpec::Network { network, prefix } => {
                let base = u32::from(network);
                let broadcast = if prefix == 32 {
                    base
                } else {
                    base | ((1u32 << (32 - prefix)) - 1)
                };

                (base.saturating_add(1)..broadcast).map(Ipv4Addr::from).collect()
            }
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, TargetSpec::Network { .. })
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetSpec::Single(addr) => write!(f, "{}", addr),
            TargetSpec::Network { network, prefix } => write!(f, "{}/{}", network, prefix),
        }
    }
}

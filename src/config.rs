//! Configuration module for the deimos scanner

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default TCP ports probed on every responding host.
pub const DEFAULT_PORTS: [u16; 4] = [22, 80, 443, 3389];

/// ICMP type-3 codes treated as "host is actively blocking ICMP":
/// host/protocol/port unreachable plus the administratively-filtered codes.
pub const DEFAULT_BLOCKING_ICMP_CODES: [u8; 6] = [1, 2, 3, 9, 10, 13];

fn default_ports() -> Vec<u16> {
    DEFAULT_PORTS.to_vec()
}

fn default_timeout() -> u64 {
    100
}

fn default_concurrency() -> usize {
    std::cmp::min(num_cpus::get(), 64).max(1)
}

fn default_blocking_codes() -> Vec<u8> {
    DEFAULT_BLOCKING_ICMP_CODES.to_vec()
}

/// Main configuration structure for scanning operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Target host or network to scan (dotted IPv4 or CIDR)
    #[serde(default)]
    pub target: String,

    /// TCP ports probed on each responding host, in order
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,

    /// Per-probe timeout in milliseconds.
    ///
    /// Deliberately aggressive: 100ms bounds total scan time for large
    /// ranges, at the cost of false "filtered" classifications on
    /// high-latency links. Raise it explicitly if that trade-off is wrong
    /// for your network.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum number of hosts probed in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// ICMP type-3 codes interpreted as active ICMP blocking.
    ///
    /// Policy table, not a protocol guarantee; tune per environment.
    #[serde(default = "default_blocking_codes")]
    pub blocking_icmp_codes: Vec<u8>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            ports: default_ports(),
            timeout: default_timeout(),
            concurrency: default_concurrency(),
            blocking_icmp_codes: default_blocking_codes(),
        }
    }
}

impl ScanConfig {
    /// Create a new scan configuration for a target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Set the ports to probe
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Set the per-probe timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the host-level concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Get the per-probe timeout as a Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| {
            crate::ScanError::ConfigError(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: ScanConfig = toml::from_str(&content)
            .map_err(|e| crate::ScanError::ConfigError(format!("failed to parse TOML: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from `~/.deimos.toml` if present, defaults otherwise
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".deimos.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.target.is_empty() {
            return Err(crate::ScanError::ConfigError(
                "target cannot be empty".to_string(),
            ));
        }

        if self.ports.is_empty() {
            return Err(crate::ScanError::ConfigError(
                "no ports specified".to_string(),
            ));
        }

        if self.timeout == 0 {
            return Err(crate::ScanError::ConfigError(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(crate::ScanError::ConfigError(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ScanConfig::new("10.0.0.5");
        assert_eq!(config.ports, vec![22, 80, 443, 3389]);
        assert_eq!(config.timeout, 100);
        assert_eq!(config.blocking_icmp_codes, vec![1, 2, 3, 9, 10, 13]);
        assert!(config.concurrency >= 1);
    }

    #[test]
    fn validation_rejects_empty_target() {
        let config = ScanConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_concurrency() {
        let config = ScanConfig::new("10.0.0.5").with_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip_with_partial_fields() {
        let parsed: ScanConfig =
            toml::from_str("target = \"192.168.0.0/24\"\nports = [80]\n").unwrap();
        assert_eq!(parsed.target, "192.168.0.0/24");
        assert_eq!(parsed.ports, vec![80]);
        assert_eq!(parsed.timeout, 100);
    }
}

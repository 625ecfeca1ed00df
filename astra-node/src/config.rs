use serde::{Deserialize, Serialize};
use std::time::Duration;

use astra_relay::config::{HostConfig, RelayLimits, DEFAULT_LISTEN_ADDR};

use crate::error::NodeError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub relay: RelayConfig,
    pub status: StatusConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub listen_addrs: Vec<String>,
    /// Addresses to advertise in addition to the bound ones, e.g.
    /// `/ip4/<public ip>/tcp/40001` when ports are forwarded by hand.
    pub announce_addrs: Vec<String>,
    /// Hex-encoded 32-byte seed for a deterministic peer id.
    pub keypair_seed: Option<String>,
    pub idle_connection_timeout_secs: u64,
    pub startup_timeout_secs: u64,
    pub confirm_observed_addrs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,
    pub max_reservations: usize,
    pub max_reservations_per_peer: usize,
    pub reservation_duration_secs: u64,
    pub max_circuits: usize,
    pub max_circuits_per_peer: usize,
    pub max_circuit_duration_secs: u64,
    pub max_circuit_bytes: u64,
    pub reservation_rate_per_peer: u32,
    pub circuit_rate_per_peer: u32,
    pub rate_interval_per_peer_secs: u64,
    pub reservation_rate_per_ip: u32,
    pub circuit_rate_per_ip: u32,
    pub rate_interval_per_ip_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Seconds between listen address reports.
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound on releasing the node's resources.
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let host = HostConfig::default();
        Self {
            listen_addrs: vec![DEFAULT_LISTEN_ADDR.to_string()],
            announce_addrs: Vec::new(),
            keypair_seed: None,
            idle_connection_timeout_secs: host.idle_connection_timeout.as_secs(),
            startup_timeout_secs: host.startup_timeout.as_secs(),
            confirm_observed_addrs: host.confirm_observed_addrs,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        let limits = RelayLimits::default();
        Self {
            enabled: true,
            max_reservations: limits.max_reservations,
            max_reservations_per_peer: limits.max_reservations_per_peer,
            reservation_duration_secs: limits.reservation_duration.as_secs(),
            max_circuits: limits.max_circuits,
            max_circuits_per_peer: limits.max_circuits_per_peer,
            max_circuit_duration_secs: limits.max_circuit_duration.as_secs(),
            max_circuit_bytes: limits.max_circuit_bytes,
            reservation_rate_per_peer: limits.reservation_rate_per_peer,
            circuit_rate_per_peer: limits.circuit_rate_per_peer,
            rate_interval_per_peer_secs: limits.rate_interval_per_peer.as_secs(),
            reservation_rate_per_ip: limits.reservation_rate_per_ip,
            circuit_rate_per_ip: limits.circuit_rate_per_ip,
            rate_interval_per_ip_secs: limits.rate_interval_per_ip.as_secs(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file. Missing sections and fields take
    /// their defaults.
    pub fn load(path: &str) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path, e),
        })?;
        let config: NodeConfig = toml::from_str(&contents).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to parse config file '{}': {}", path, e),
        })?;
        Ok(config)
    }

    /// Build the host configuration, decoding the keypair seed.
    pub fn host_config(&self) -> Result<HostConfig, NodeError> {
        let keypair_seed = self
            .network
            .keypair_seed
            .as_deref()
            .map(parse_seed)
            .transpose()?;

        Ok(HostConfig {
            listen_addrs: self.network.listen_addrs.clone(),
            announce_addrs: self.network.announce_addrs.clone(),
            keypair_seed,
            idle_connection_timeout: Duration::from_secs(self.network.idle_connection_timeout_secs),
            startup_timeout: Duration::from_secs(self.network.startup_timeout_secs),
            confirm_observed_addrs: self.network.confirm_observed_addrs,
        })
    }

    /// Relay limits as configured. Validation happens when the relay is
    /// attached so that bad limits degrade the relay instead of the node.
    pub fn relay_limits(&self) -> RelayLimits {
        let r = &self.relay;
        RelayLimits {
            max_reservations: r.max_reservations,
            max_reservations_per_peer: r.max_reservations_per_peer,
            reservation_duration: Duration::from_secs(r.reservation_duration_secs),
            max_circuits: r.max_circuits,
            max_circuits_per_peer: r.max_circuits_per_peer,
            max_circuit_duration: Duration::from_secs(r.max_circuit_duration_secs),
            max_circuit_bytes: r.max_circuit_bytes,
            reservation_rate_per_peer: r.reservation_rate_per_peer,
            circuit_rate_per_peer: r.circuit_rate_per_peer,
            rate_interval_per_peer: Duration::from_secs(r.rate_interval_per_peer_secs),
            reservation_rate_per_ip: r.reservation_rate_per_ip,
            circuit_rate_per_ip: r.circuit_rate_per_ip,
            rate_interval_per_ip: Duration::from_secs(r.rate_interval_per_ip_secs),
        }
    }

    pub fn status_interval(&self) -> Result<Duration, NodeError> {
        if self.status.interval_secs == 0 {
            return Err(NodeError::ConfigError {
                reason: "status.interval_secs must be at least 1".to_string(),
            });
        }
        Ok(Duration::from_secs(self.status.interval_secs))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown.timeout_secs)
    }
}

/// Decode a hex-encoded 32-byte keypair seed.
pub fn parse_seed(seed_hex: &str) -> Result<[u8; 32], NodeError> {
    let bytes = hex::decode(seed_hex).map_err(|e| NodeError::ConfigError {
        reason: format!("invalid keypair seed hex: {}", e),
    })?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| NodeError::ConfigError {
        reason: format!("keypair seed must be 32 bytes, got {}", bytes.len()),
    })
}

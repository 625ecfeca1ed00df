use std::num::NonZeroU32;
use std::time::Duration;

use libp2p::relay;

use crate::error::HostError;

/// Default listen address: every IPv4 interface, OS-assigned TCP port.
pub const DEFAULT_LISTEN_ADDR: &str = "/ip4/0.0.0.0/tcp/0";

/// Protocol version advertised over identify.
pub const IDENTIFY_PROTOCOL: &str = "/astra-relay/1.0.0";

/// Configuration for a relay-capable node.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Multiaddrs to listen on.
    pub listen_addrs: Vec<String>,
    /// Extra addresses to advertise as externally reachable (e.g. a public IP
    /// with manually forwarded ports). Invalid entries are skipped.
    pub announce_addrs: Vec<String>,
    /// Optional keypair seed (32 bytes). If None, generates random.
    pub keypair_seed: Option<[u8; 32]>,
    /// How long a connection without active streams is kept open.
    pub idle_connection_timeout: Duration,
    /// How long `RelayNode::new` waits for the first bound listen address.
    pub startup_timeout: Duration,
    /// Promote addresses observed by remote peers straight to confirmed
    /// external addresses.
    pub confirm_observed_addrs: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec![DEFAULT_LISTEN_ADDR.to_string()],
            announce_addrs: Vec::new(),
            keypair_seed: None,
            idle_connection_timeout: Duration::from_secs(60),
            startup_timeout: Duration::from_secs(10),
            confirm_observed_addrs: false,
        }
    }
}

/// Resource limits for the circuit relay service.
///
/// Defaults mirror the libp2p relay defaults so an unconfigured node behaves
/// like any other public v2 relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayLimits {
    pub max_reservations: usize,
    pub max_reservations_per_peer: usize,
    pub reservation_duration: Duration,
    pub max_circuits: usize,
    pub max_circuits_per_peer: usize,
    pub max_circuit_duration: Duration,
    pub max_circuit_bytes: u64,
    /// Reservation requests accepted per peer within `rate_interval_per_peer`.
    pub reservation_rate_per_peer: u32,
    /// Circuit requests accepted per source peer within `rate_interval_per_peer`.
    pub circuit_rate_per_peer: u32,
    pub rate_interval_per_peer: Duration,
    /// Reservation requests accepted per IP within `rate_interval_per_ip`.
    pub reservation_rate_per_ip: u32,
    /// Circuit requests accepted per source IP within `rate_interval_per_ip`.
    pub circuit_rate_per_ip: u32,
    pub rate_interval_per_ip: Duration,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            max_reservations: 128,
            max_reservations_per_peer: 4,
            reservation_duration: Duration::from_secs(60 * 60),
            max_circuits: 16,
            max_circuits_per_peer: 4,
            max_circuit_duration: Duration::from_secs(2 * 60),
            max_circuit_bytes: 1 << 17,
            reservation_rate_per_peer: 30,
            circuit_rate_per_peer: 30,
            rate_interval_per_peer: Duration::from_secs(2 * 60),
            reservation_rate_per_ip: 60,
            circuit_rate_per_ip: 60,
            rate_interval_per_ip: Duration::from_secs(60),
        }
    }
}

impl RelayLimits {
    /// Check that the limits describe a relay that can accept anything at all.
    pub fn validate(&self) -> Result<(), HostError> {
        let invalid = |reason: &str| HostError::InvalidRelayLimits {
            reason: reason.to_string(),
        };

        if self.max_reservations == 0 || self.max_reservations_per_peer == 0 {
            return Err(invalid("reservation limits must be non-zero"));
        }
        if self.max_circuits == 0 || self.max_circuits_per_peer == 0 {
            return Err(invalid("circuit limits must be non-zero"));
        }
        if self.reservation_duration.is_zero() || self.max_circuit_duration.is_zero() {
            return Err(invalid("durations must be non-zero"));
        }
        if self.max_circuit_bytes == 0 {
            return Err(invalid("max_circuit_bytes must be non-zero"));
        }
        if self.rate_interval_per_peer.is_zero() || self.rate_interval_per_ip.is_zero() {
            return Err(invalid("rate limit intervals must be non-zero"));
        }
        Ok(())
    }

    /// Build the libp2p relay configuration, replacing the library's default
    /// rate limiters with the configured ones.
    pub fn to_relay_config(&self) -> Result<relay::Config, HostError> {
        self.validate()?;

        let rate = |value: u32, name: &str| {
            NonZeroU32::new(value).ok_or_else(|| HostError::InvalidRelayLimits {
                reason: format!("{} must be non-zero", name),
            })
        };
        let reservation_per_peer =
            rate(self.reservation_rate_per_peer, "reservation_rate_per_peer")?;
        let circuit_per_peer = rate(self.circuit_rate_per_peer, "circuit_rate_per_peer")?;
        let reservation_per_ip = rate(self.reservation_rate_per_ip, "reservation_rate_per_ip")?;
        let circuit_per_ip = rate(self.circuit_rate_per_ip, "circuit_rate_per_ip")?;

        let mut config = relay::Config::default();
        config.max_reservations = self.max_reservations;
        config.max_reservations_per_peer = self.max_reservations_per_peer;
        config.reservation_duration = self.reservation_duration;
        config.max_circuits = self.max_circuits;
        config.max_circuits_per_peer = self.max_circuits_per_peer;
        config.max_circuit_duration = self.max_circuit_duration;
        config.max_circuit_bytes = self.max_circuit_bytes;
        config.reservation_rate_limiters.clear();
        config.circuit_src_rate_limiters.clear();

        let config = config
            .reservation_rate_per_peer(reservation_per_peer, self.rate_interval_per_peer)
            .circuit_src_per_peer(circuit_per_peer, self.rate_interval_per_peer)
            .reservation_rate_per_ip(reservation_per_ip, self.rate_interval_per_ip)
            .circuit_src_per_ip(circuit_per_ip, self.rate_interval_per_ip);

        Ok(config)
    }
}

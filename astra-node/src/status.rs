use std::fmt;

use astra_relay::addresses::format_addrs;
use astra_relay::peer_manager::HostStats;
use astra_relay::{Multiaddr, PeerId};

/// Whether the node is offering the relay service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// The relay service is attached and accepting reservations.
    Attached,
    /// Attaching the relay failed; the node runs without it.
    Degraded,
    /// The relay was turned off in configuration.
    Disabled,
}

/// Supervisor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Starting,
    Running(RelayStatus),
    ShuttingDown,
    Terminated,
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayStatus::Attached => write!(f, "relay attached"),
            RelayStatus::Degraded => write!(f, "relay degraded"),
            RelayStatus::Disabled => write!(f, "relay disabled"),
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Starting => write!(f, "starting"),
            NodeState::Running(relay) => write!(f, "running ({})", relay),
            NodeState::ShuttingDown => write!(f, "shutting down"),
            NodeState::Terminated => write!(f, "terminated"),
        }
    }
}

/// One periodic status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub peer_id: PeerId,
    pub state: NodeState,
    pub listen_addrs: Vec<Multiaddr>,
    pub stats: HostStats,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Listen addresses: {} | {} | peers={} reservations={} circuits={}",
            format_addrs(&self.listen_addrs),
            self.state,
            self.stats.connected_peers,
            self.stats.active_reservations,
            self.stats.active_circuits,
        )
    }
}

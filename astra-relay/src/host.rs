//! Host traits the supervisor drives.
//!
//! A relay can be attached to any node that is addressable and can be driven,
//! so the supervisor is written against these traits rather than against
//! [`RelayNode`](crate::relay::RelayNode) directly.

use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};

use crate::config::RelayLimits;
use crate::error::HostError;
use crate::peer_manager::HostStats;

/// Something with a network identity and a set of reachable addresses.
pub trait Addressable {
    /// The node's peer id.
    fn peer_id(&self) -> PeerId;

    /// Currently bound listen addresses followed by known external addresses.
    /// The set may change as listeners come and go.
    fn listen_addrs(&self) -> Vec<Multiaddr>;
}

/// Notable things that happened on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ListenAddrAdded(Multiaddr),
    ListenAddrExpired(Multiaddr),
    ExternalAddrConfirmed(Multiaddr),
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    ReservationAccepted { peer: PeerId, renewed: bool },
    ReservationDenied { peer: PeerId },
    ReservationExpired { peer: PeerId },
    CircuitOpened { src: PeerId, dst: PeerId },
    CircuitDenied { src: PeerId, dst: PeerId },
    CircuitClosed { src: PeerId, dst: PeerId },
}

/// A node that can carry a circuit relay service.
#[async_trait]
pub trait RelayHost: Addressable + Send {
    /// Attach a relay service bound to this node.
    fn attach_relay(&mut self, limits: &RelayLimits) -> Result<(), HostError>;

    /// Whether a relay service is currently attached.
    fn relay_attached(&self) -> bool;

    /// Current peer and relay counters.
    fn stats(&self) -> HostStats;

    /// Drive the node until something worth reporting happens.
    ///
    /// Must be cancel-safe: dropping the future loses no state.
    /// Returns `None` once the node can produce no further events.
    async fn next_event(&mut self) -> Option<HostEvent>;

    /// Release the node's listeners, connections and relay.
    ///
    /// A second call returns [`HostError::AlreadyClosed`].
    async fn close(&mut self) -> Result<(), HostError>;
}

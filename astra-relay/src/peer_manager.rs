use libp2p::PeerId;
use std::collections::HashMap;

/// Information about a connected peer.
#[derive(Debug, Default)]
pub struct PeerInfo {
    /// Number of open connections to this peer.
    pub connections: usize,
    /// Agent string reported over identify.
    pub agent_version: Option<String>,
}

/// Snapshot of the node's peer and relay bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub connected_peers: usize,
    pub active_reservations: usize,
    pub active_circuits: usize,
}

/// Tracks connected peers, relay reservations and relayed circuits.
///
/// The relay holds at most one reservation per connection, but its events
/// only name the peer. Reservations are therefore counted per peer, and a
/// closed connection drops every reservation the peer held, since the relay
/// forgets the reservation bound to that connection without telling anyone.
/// A reservation that survives on another connection is counted again on its
/// next renewal.
#[derive(Default)]
pub struct PeerManager {
    peers: HashMap<PeerId, PeerInfo>,
    reservations: HashMap<PeerId, usize>,
    circuits: HashMap<(PeerId, PeerId), usize>,
}

impl PeerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. Returns true if this is the first connection
    /// to the peer.
    pub fn add_connection(&mut self, peer_id: PeerId) -> bool {
        let info = self.peers.entry(peer_id).or_default();
        info.connections += 1;
        info.connections == 1
    }

    /// Record a closed connection and drop the peer's reservations. Returns
    /// the peer's info if this was its last connection.
    pub fn remove_connection(&mut self, peer_id: &PeerId) -> Option<PeerInfo> {
        let info = self.peers.get_mut(peer_id)?;
        self.reservations.remove(peer_id);
        info.connections = info.connections.saturating_sub(1);
        if info.connections > 0 {
            return None;
        }
        self.peers.remove(peer_id)
    }

    /// Set the agent version for a peer (usually from identify).
    pub fn set_agent_version(&mut self, peer_id: &PeerId, agent: String) {
        if let Some(info) = self.peers.get_mut(peer_id) {
            info.agent_version = Some(agent);
        }
    }

    /// Record an accepted reservation. A renewal replaces a reservation that
    /// already exists, unless that one was dropped with a closed connection.
    pub fn add_reservation(&mut self, peer_id: PeerId, renewed: bool) {
        let count = self.reservations.entry(peer_id).or_insert(0);
        if !renewed || *count == 0 {
            *count += 1;
        }
    }

    /// Record a reservation that timed out.
    pub fn remove_reservation(&mut self, peer_id: &PeerId) {
        if let Some(count) = self.reservations.get_mut(peer_id) {
            *count -= 1;
            if *count == 0 {
                self.reservations.remove(peer_id);
            }
        }
    }

    pub fn open_circuit(&mut self, src: PeerId, dst: PeerId) {
        *self.circuits.entry((src, dst)).or_insert(0) += 1;
    }

    pub fn close_circuit(&mut self, src: PeerId, dst: PeerId) {
        if let Some(count) = self.circuits.get_mut(&(src, dst)) {
            *count -= 1;
            if *count == 0 {
                self.circuits.remove(&(src, dst));
            }
        }
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            connected_peers: self.peers.len(),
            active_reservations: self.reservations.values().sum(),
            active_circuits: self.circuits.values().sum(),
        }
    }

    /// Forget everything. Used when the node closes.
    pub fn clear(&mut self) {
        self.peers.clear();
        self.reservations.clear();
        self.circuits.clear();
    }
}

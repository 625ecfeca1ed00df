//! A libp2p node that can offer the circuit relay v2 service.
//!
//! Any directly dialable node can act as a relay for peers that cannot reach
//! each other; relay v2 is rate limited, so offering it is safe for ordinary
//! nodes, not only dedicated relay servers. The relay is attached to a running
//! [`RelayNode`](relay::RelayNode) through the [`RelayHost`](host::RelayHost)
//! trait.

pub mod addresses;
pub mod behaviour;
pub mod config;
pub mod error;
pub mod host;
pub mod peer_manager;
pub mod relay;

pub use libp2p::{Multiaddr, PeerId};

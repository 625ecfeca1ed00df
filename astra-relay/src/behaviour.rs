use libp2p::identity::Keypair;
use libp2p::swarm::behaviour::toggle::Toggle;
use libp2p::swarm::NetworkBehaviour;
use libp2p::{identify, ping, relay};

use crate::config::IDENTIFY_PROTOCOL;

/// Combined network behaviour for a relay-capable node.
#[derive(NetworkBehaviour)]
pub struct HostBehaviour {
    /// Circuit relay v2 server. Disabled until a relay is attached.
    pub relay: Toggle<relay::Behaviour>,
    /// Identify protocol; also how peers learn our observed address.
    pub identify: identify::Behaviour,
    /// Keep-alive and liveness checks.
    pub ping: ping::Behaviour,
}

/// Build a HostBehaviour from a keypair, with the relay detached.
///
/// Returns `Result<HostBehaviour, Box<dyn Error + Send + Sync>>` to conform
/// to the `TryIntoBehaviour` trait expected by `SwarmBuilder::with_behaviour`.
pub fn build_behaviour(
    keypair: &Keypair,
) -> Result<HostBehaviour, Box<dyn std::error::Error + Send + Sync>> {
    let identify = identify::Behaviour::new(
        identify::Config::new(IDENTIFY_PROTOCOL.to_string(), keypair.public())
            .with_agent_version(format!("astra-relay/{}", env!("CARGO_PKG_VERSION"))),
    );

    Ok(HostBehaviour {
        relay: Toggle::from(None),
        identify,
        ping: ping::Behaviour::new(ping::Config::new()),
    })
}

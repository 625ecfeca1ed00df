use async_trait::async_trait;
use futures::StreamExt;
use libp2p::core::transport::ListenerId;
use libp2p::swarm::behaviour::toggle::Toggle;
use libp2p::swarm::SwarmEvent;
use libp2p::{identify, relay, Multiaddr, PeerId, Swarm, SwarmBuilder};
use tracing::{debug, info, warn};

use crate::addresses::{merge_addrs, parse_announce_addrs, parse_listen_addrs};
use crate::behaviour::{build_behaviour, HostBehaviour, HostBehaviourEvent};
use crate::config::{HostConfig, RelayLimits};
use crate::error::HostError;
use crate::host::{Addressable, HostEvent, RelayHost};
use crate::peer_manager::{HostStats, PeerManager};

/// A libp2p node that can carry a circuit relay v2 service.
pub struct RelayNode {
    config: HostConfig,
    swarm: Swarm<HostBehaviour>,
    listener_ids: Vec<ListenerId>,
    peer_manager: PeerManager,
    closed: bool,
}

/// Derive the libp2p identity for an optional seed.
pub fn keypair_from_seed(
    seed: Option<&[u8; 32]>,
) -> Result<libp2p::identity::Keypair, HostError> {
    match seed {
        Some(seed) => {
            let mut seed_bytes = *seed;
            libp2p::identity::Keypair::ed25519_from_bytes(&mut seed_bytes).map_err(|e| {
                HostError::InvalidKeypairSeed {
                    reason: e.to_string(),
                }
            })
        }
        None => Ok(libp2p::identity::Keypair::generate_ed25519()),
    }
}

impl RelayNode {
    /// Create a new RelayNode and wait until it is listening on at least one
    /// address.
    pub async fn new(config: HostConfig) -> Result<Self, HostError> {
        let listen_addrs = parse_listen_addrs(&config.listen_addrs)?;
        let announce_addrs = parse_announce_addrs(&config.announce_addrs);
        let keypair = keypair_from_seed(config.keypair_seed.as_ref())?;

        let mut swarm = SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(
                libp2p::tcp::Config::default(),
                libp2p::noise::Config::new,
                libp2p::yamux::Config::default,
            )
            .map_err(|e| HostError::Transport {
                reason: format!("tcp transport: {}", e),
            })?
            .with_behaviour(build_behaviour)
            .map_err(|e| HostError::Behaviour {
                reason: e.to_string(),
            })?
            .with_swarm_config(|cfg| {
                cfg.with_idle_connection_timeout(config.idle_connection_timeout)
            })
            .build();

        let mut listener_ids = Vec::with_capacity(listen_addrs.len());
        for addr in listen_addrs {
            let id = swarm
                .listen_on(addr.clone())
                .map_err(|e| HostError::Listen {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                })?;
            listener_ids.push(id);
        }

        for addr in announce_addrs {
            info!(%addr, "announcing external address");
            swarm.add_external_address(addr);
        }

        let mut node = Self {
            config,
            swarm,
            listener_ids,
            peer_manager: PeerManager::new(),
            closed: false,
        };
        node.wait_for_listen_addr().await?;

        info!(
            peer_id = %node.local_peer_id(),
            addrs = ?node.listen_addrs(),
            "node started"
        );

        Ok(node)
    }

    /// Poll the swarm until the first listener reports a bound address.
    async fn wait_for_listen_addr(&mut self) -> Result<(), HostError> {
        let timeout = self.config.startup_timeout;
        let wait = async {
            while self.swarm.listeners().next().is_none() {
                match self.swarm.next().await {
                    Some(SwarmEvent::ListenerClosed {
                        reason: Err(e), ..
                    })
                    | Some(SwarmEvent::ListenerError { error: e, .. }) => {
                        warn!("listener failed during startup: {}", e);
                    }
                    Some(event) => {
                        let _ = self.handle_swarm_event(event);
                    }
                    None => break,
                }
            }
        };

        let _ = tokio::time::timeout(timeout, wait).await;
        if self.swarm.listeners().next().is_none() {
            return Err(HostError::NoListenAddrs {
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    /// Get the local peer ID.
    pub fn local_peer_id(&self) -> PeerId {
        *self.swarm.local_peer_id()
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn handle_swarm_event(
        &mut self,
        event: SwarmEvent<HostBehaviourEvent>,
    ) -> Option<HostEvent> {
        match event {
            SwarmEvent::Behaviour(event) => self.handle_behaviour_event(event),
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(%address, "listening on new address");
                Some(HostEvent::ListenAddrAdded(address))
            }
            SwarmEvent::ExpiredListenAddr { address, .. } => {
                info!(%address, "listen address expired");
                Some(HostEvent::ListenAddrExpired(address))
            }
            SwarmEvent::ListenerClosed {
                addresses, reason, ..
            } => {
                match reason {
                    Ok(()) => debug!(?addresses, "listener closed"),
                    Err(e) => warn!(?addresses, "listener closed: {}", e),
                }
                None
            }
            SwarmEvent::ListenerError { error, .. } => {
                warn!("listener error: {}", error);
                None
            }
            SwarmEvent::ConnectionEstablished {
                peer_id, endpoint, ..
            } => {
                debug!(%peer_id, ?endpoint, "connection established");
                self.peer_manager
                    .add_connection(peer_id)
                    .then_some(HostEvent::PeerConnected(peer_id))
            }
            SwarmEvent::ConnectionClosed { peer_id, cause, .. } => {
                debug!(%peer_id, ?cause, "connection closed");
                let info = self.peer_manager.remove_connection(&peer_id)?;
                debug!(
                    %peer_id,
                    agent = info.agent_version.as_deref().unwrap_or("unknown"),
                    "peer disconnected"
                );
                Some(HostEvent::PeerDisconnected(peer_id))
            }
            SwarmEvent::NewExternalAddrCandidate { address } => {
                if self.config.confirm_observed_addrs && !self.closed {
                    debug!(%address, "confirming observed address");
                    self.swarm.add_external_address(address);
                }
                None
            }
            SwarmEvent::ExternalAddrConfirmed { address } => {
                info!(%address, "external address confirmed");
                Some(HostEvent::ExternalAddrConfirmed(address))
            }
            other => {
                debug!(?other, "other swarm event");
                None
            }
        }
    }

    fn handle_behaviour_event(&mut self, event: HostBehaviourEvent) -> Option<HostEvent> {
        match event {
            HostBehaviourEvent::Relay(event) => self.handle_relay_event(event),
            HostBehaviourEvent::Identify(identify::Event::Received { peer_id, info, .. }) => {
                debug!(
                    %peer_id,
                    protocol = %info.protocol_version,
                    agent = %info.agent_version,
                    observed = %info.observed_addr,
                    "identified peer"
                );
                self.peer_manager.set_agent_version(&peer_id, info.agent_version);
                None
            }
            HostBehaviourEvent::Identify(_) => None,
            HostBehaviourEvent::Ping(event) => {
                if let Err(e) = &event.result {
                    debug!(peer = %event.peer, "ping failed: {}", e);
                }
                None
            }
        }
    }

    fn handle_relay_event(&mut self, event: relay::Event) -> Option<HostEvent> {
        match event {
            relay::Event::ReservationReqAccepted {
                src_peer_id,
                renewed,
                ..
            } => {
                info!(peer = %src_peer_id, renewed, "relay reservation accepted");
                self.peer_manager.add_reservation(src_peer_id, renewed);
                Some(HostEvent::ReservationAccepted {
                    peer: src_peer_id,
                    renewed,
                })
            }
            relay::Event::ReservationReqDenied { src_peer_id, .. } => {
                warn!(peer = %src_peer_id, "relay reservation denied");
                Some(HostEvent::ReservationDenied { peer: src_peer_id })
            }
            relay::Event::ReservationTimedOut { src_peer_id, .. } => {
                debug!(peer = %src_peer_id, "relay reservation timed out");
                self.peer_manager.remove_reservation(&src_peer_id);
                Some(HostEvent::ReservationExpired { peer: src_peer_id })
            }
            relay::Event::CircuitReqAccepted {
                src_peer_id,
                dst_peer_id,
                ..
            } => {
                info!(src = %src_peer_id, dst = %dst_peer_id, "relay circuit opened");
                self.peer_manager.open_circuit(src_peer_id, dst_peer_id);
                Some(HostEvent::CircuitOpened {
                    src: src_peer_id,
                    dst: dst_peer_id,
                })
            }
            relay::Event::CircuitReqDenied {
                src_peer_id,
                dst_peer_id,
                ..
            } => {
                warn!(src = %src_peer_id, dst = %dst_peer_id, "relay circuit denied");
                Some(HostEvent::CircuitDenied {
                    src: src_peer_id,
                    dst: dst_peer_id,
                })
            }
            relay::Event::CircuitClosed {
                src_peer_id,
                dst_peer_id,
                error,
                ..
            } => {
                match error {
                    Some(e) => {
                        debug!(src = %src_peer_id, dst = %dst_peer_id, "relay circuit closed: {}", e)
                    }
                    None => debug!(src = %src_peer_id, dst = %dst_peer_id, "relay circuit closed"),
                }
                self.peer_manager.close_circuit(src_peer_id, dst_peer_id);
                Some(HostEvent::CircuitClosed {
                    src: src_peer_id,
                    dst: dst_peer_id,
                })
            }
            other => {
                debug!(?other, "other relay event");
                None
            }
        }
    }
}

impl Addressable for RelayNode {
    fn peer_id(&self) -> PeerId {
        self.local_peer_id()
    }

    fn listen_addrs(&self) -> Vec<Multiaddr> {
        merge_addrs(
            self.swarm
                .listeners()
                .chain(self.swarm.external_addresses()),
        )
    }
}

#[async_trait]
impl RelayHost for RelayNode {
    fn attach_relay(&mut self, limits: &RelayLimits) -> Result<(), HostError> {
        if self.closed {
            return Err(HostError::NodeClosed);
        }
        if self.swarm.behaviour().relay.is_enabled() {
            return Err(HostError::RelayAlreadyAttached);
        }

        let relay_config = limits.to_relay_config()?;
        let peer_id = self.local_peer_id();
        self.swarm.behaviour_mut().relay =
            Toggle::from(Some(relay::Behaviour::new(peer_id, relay_config)));

        info!(
            %peer_id,
            max_reservations = limits.max_reservations,
            max_circuits = limits.max_circuits,
            "relay service attached"
        );
        Ok(())
    }

    fn relay_attached(&self) -> bool {
        self.swarm.behaviour().relay.is_enabled()
    }

    fn stats(&self) -> HostStats {
        self.peer_manager.stats()
    }

    async fn next_event(&mut self) -> Option<HostEvent> {
        loop {
            let event = self.swarm.next().await?;
            if let Some(event) = self.handle_swarm_event(event) {
                return Some(event);
            }
        }
    }

    async fn close(&mut self) -> Result<(), HostError> {
        if self.closed {
            return Err(HostError::AlreadyClosed);
        }
        self.closed = true;

        for id in self.listener_ids.drain(..) {
            self.swarm.remove_listener(id);
        }
        let peers: Vec<PeerId> = self.swarm.connected_peers().copied().collect();
        for peer in peers {
            let _ = self.swarm.disconnect_peer_id(peer);
        }

        while self.swarm.listeners().next().is_some()
            || self.swarm.network_info().num_peers() > 0
        {
            match self.swarm.next().await {
                Some(event) => {
                    let _ = self.handle_swarm_event(event);
                }
                None => {
                    return Err(HostError::Close {
                        reason: "swarm stream ended during close".to_string(),
                    });
                }
            }
        }

        self.swarm.behaviour_mut().relay = Toggle::from(None);
        self.peer_manager.clear();
        info!(peer_id = %self.local_peer_id(), "node closed");
        Ok(())
    }
}

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use astra_relay::config::RelayLimits;
use astra_relay::host::{HostEvent, RelayHost};
use astra_relay::relay::RelayNode;
use tokio::time::MissedTickBehavior;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::signal::ShutdownSignal;
use crate::status::{NodeState, RelayStatus, StatusReport};

/// Owns a node and walks it through start, relay activation, periodic status
/// reports and shutdown.
pub struct Supervisor<H> {
    host: H,
    state: NodeState,
    relay_enabled: bool,
    relay_limits: RelayLimits,
    report_interval: Duration,
    shutdown_timeout: Duration,
    metrics: Arc<NodeMetrics>,
}

impl Supervisor<RelayNode> {
    /// Start a libp2p node from the given configuration.
    ///
    /// Any failure here is fatal for the process.
    pub async fn start(config: &NodeConfig) -> Result<Self, NodeError> {
        let host_config = config.host_config()?;
        let host = RelayNode::new(host_config).await?;
        Self::with_host(host, config)
    }
}

impl<H: RelayHost> Supervisor<H> {
    /// Take ownership of an already constructed host.
    pub fn with_host(host: H, config: &NodeConfig) -> Result<Self, NodeError> {
        let report_interval = config.status_interval()?;
        let listen_addrs = host.listen_addrs();
        if listen_addrs.is_empty() {
            return Err(NodeError::NoListenAddrs);
        }

        let metrics = Arc::new(NodeMetrics::new());
        metrics.set_stats(listen_addrs.len(), &host.stats());

        Ok(Self {
            host,
            state: NodeState::Starting,
            relay_enabled: config.relay.enabled,
            relay_limits: config.relay_limits(),
            report_interval,
            shutdown_timeout: config.shutdown_timeout(),
            metrics,
        })
    }

    /// Attach the relay service. Never fails: a relay that cannot be attached
    /// leaves the node running in degraded mode.
    pub fn enable_relay(&mut self) -> RelayStatus {
        match self.state {
            NodeState::Running(RelayStatus::Attached) => return RelayStatus::Attached,
            NodeState::ShuttingDown | NodeState::Terminated => {
                tracing::warn!(state = %self.state, "cannot enable relay on a stopped node");
                return RelayStatus::Degraded;
            }
            NodeState::Starting | NodeState::Running(_) => {}
        }

        let status = if !self.relay_enabled {
            tracing::info!("relay disabled by configuration");
            RelayStatus::Disabled
        } else {
            match self.host.attach_relay(&self.relay_limits) {
                Ok(()) => {
                    tracing::info!(peer_id = %self.host.peer_id(), "relay service enabled");
                    RelayStatus::Attached
                }
                Err(e) => {
                    tracing::warn!("Failed to instantiate the relay, continuing without it: {}", e);
                    RelayStatus::Degraded
                }
            }
        };

        self.state = NodeState::Running(status);
        status
    }

    /// Build and emit one status report.
    pub fn report_status(&self) -> StatusReport {
        let report = StatusReport {
            peer_id: self.host.peer_id(),
            state: self.state,
            listen_addrs: self.host.listen_addrs(),
            stats: self.host.stats(),
        };
        self.metrics
            .set_stats(report.listen_addrs.len(), &report.stats);
        self.metrics.status_reports.inc();
        tracing::info!("{}", report);
        report
    }

    /// Run until `shutdown` resolves, then release the node.
    ///
    /// Status reports, node events and the shutdown future share one select
    /// loop, so a termination request is seen on the next scheduler turn.
    pub async fn run<S>(&mut self, shutdown: S) -> Result<(), NodeError>
    where
        S: Future<Output = ShutdownSignal>,
    {
        match self.state {
            NodeState::Starting => {
                self.enable_relay();
            }
            NodeState::ShuttingDown | NodeState::Terminated => {
                return Err(astra_relay::error::HostError::NodeClosed.into());
            }
            NodeState::Running(_) => {}
        }

        let mut ticker = tokio::time::interval(self.report_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut host_events_ended = false;

        tracing::info!("Node is running. Press Ctrl+C to stop.");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report_status();
                }
                event = self.host.next_event(), if !host_events_ended => {
                    match event {
                        Some(event) => self.on_host_event(&event),
                        None => {
                            tracing::warn!("node event stream ended");
                            host_events_ended = true;
                        }
                    }
                }
                signal = &mut shutdown => {
                    tracing::info!(%signal, "Received signal, shutting down...");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Release the node's resources, bounded by the shutdown timeout.
    ///
    /// Calling this again after a successful shutdown is a no-op.
    pub async fn shutdown(&mut self) -> Result<(), NodeError> {
        if self.state == NodeState::Terminated {
            tracing::debug!("node already terminated");
            return Ok(());
        }
        self.state = NodeState::ShuttingDown;
        tracing::info!("Shutting down node...");

        match tokio::time::timeout(self.shutdown_timeout, self.host.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_recoverable() => {
                tracing::debug!("{}", e);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(NodeError::ShutdownTimeout {
                    timeout: self.shutdown_timeout,
                })
            }
        }

        self.state = NodeState::Terminated;
        tracing::debug!(metrics = %self.metrics.encode(), "final metrics");
        tracing::info!("Node shutdown complete");
        Ok(())
    }

    fn on_host_event(&self, event: &HostEvent) {
        tracing::debug!(?event, "host event");
        self.metrics.record_event(event);
        self.metrics
            .set_stats(self.host.listen_addrs().len(), &self.host.stats());
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Access the metrics (for testing).
    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }
}

use astra_relay::host::HostEvent;
use astra_relay::peer_manager::HostStats;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Node-wide Prometheus metrics.
pub struct NodeMetrics {
    pub listen_addrs: Gauge,
    pub connected_peers: Gauge,
    pub active_reservations: Gauge,
    pub active_circuits: Gauge,
    pub reservations_accepted: Counter,
    pub reservations_denied: Counter,
    pub circuits_accepted: Counter,
    pub circuits_denied: Counter,
    pub status_reports: Counter,
    pub registry: Registry,
}

impl NodeMetrics {
    /// Create a new metrics registry with all node metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let listen_addrs = Gauge::default();
        let connected_peers = Gauge::default();
        let active_reservations = Gauge::default();
        let active_circuits = Gauge::default();
        let reservations_accepted = Counter::default();
        let reservations_denied = Counter::default();
        let circuits_accepted = Counter::default();
        let circuits_denied = Counter::default();
        let status_reports = Counter::default();

        registry.register(
            "astra_listen_addrs",
            "Number of addresses the node is reachable on",
            listen_addrs.clone(),
        );
        registry.register(
            "astra_connected_peers",
            "Number of connected peers",
            connected_peers.clone(),
        );
        registry.register(
            "astra_relay_active_reservations",
            "Relay reservations currently held",
            active_reservations.clone(),
        );
        registry.register(
            "astra_relay_active_circuits",
            "Relayed circuits currently open",
            active_circuits.clone(),
        );
        registry.register(
            "astra_relay_reservations_accepted",
            "Total relay reservations accepted (including renewals)",
            reservations_accepted.clone(),
        );
        registry.register(
            "astra_relay_reservations_denied",
            "Total relay reservations denied",
            reservations_denied.clone(),
        );
        registry.register(
            "astra_relay_circuits_accepted",
            "Total relay circuits accepted",
            circuits_accepted.clone(),
        );
        registry.register(
            "astra_relay_circuits_denied",
            "Total relay circuits denied",
            circuits_denied.clone(),
        );
        registry.register(
            "astra_status_reports",
            "Total status reports emitted",
            status_reports.clone(),
        );

        Self {
            listen_addrs,
            connected_peers,
            active_reservations,
            active_circuits,
            reservations_accepted,
            reservations_denied,
            circuits_accepted,
            circuits_denied,
            status_reports,
            registry,
        }
    }

    /// Bump the counters an event contributes to.
    pub fn record_event(&self, event: &HostEvent) {
        match event {
            HostEvent::ReservationAccepted { .. } => {
                self.reservations_accepted.inc();
            }
            HostEvent::ReservationDenied { .. } => {
                self.reservations_denied.inc();
            }
            HostEvent::CircuitOpened { .. } => {
                self.circuits_accepted.inc();
            }
            HostEvent::CircuitDenied { .. } => {
                self.circuits_denied.inc();
            }
            _ => {}
        }
    }

    /// Refresh the gauges from a host snapshot.
    pub fn set_stats(&self, listen_addrs: usize, stats: &HostStats) {
        self.listen_addrs.set(listen_addrs as i64);
        self.connected_peers.set(stats.connected_peers as i64);
        self.active_reservations.set(stats.active_reservations as i64);
        self.active_circuits.set(stats.active_circuits as i64);
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buf, &self.registry) {
            tracing::warn!("failed to encode metrics: {}", e);
        }
        buf
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

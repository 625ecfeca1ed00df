//! Supervisor lifecycle against a scripted host: status reporting, degraded
//! relay, start failure and signal-driven shutdown.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use astra_node::config::NodeConfig;
use astra_node::error::NodeError;
use astra_node::signal::ShutdownSignal;
use astra_node::status::{NodeState, RelayStatus};
use astra_node::supervisor::Supervisor;
use astra_relay::config::RelayLimits;
use astra_relay::error::HostError;
use astra_relay::host::{Addressable, HostEvent, RelayHost};
use astra_relay::peer_manager::HostStats;
use astra_relay::{Multiaddr, PeerId};
use async_trait::async_trait;
use tokio::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CloseBehaviour {
    Succeed,
    Fail,
    Hang,
}

/// Helper: a host whose behaviour is fixed up front.
struct ScriptedHost {
    peer_id: PeerId,
    addrs: Vec<Multiaddr>,
    fail_attach: bool,
    attached: bool,
    closed: bool,
    close_behaviour: CloseBehaviour,
    close_calls: Arc<AtomicUsize>,
    events: VecDeque<HostEvent>,
    end_events: bool,
    stats: HostStats,
}

impl ScriptedHost {
    fn new() -> Self {
        Self {
            peer_id: PeerId::random(),
            addrs: vec!["/ip4/127.0.0.1/tcp/40001".parse().unwrap()],
            fail_attach: false,
            attached: false,
            closed: false,
            close_behaviour: CloseBehaviour::Succeed,
            close_calls: Arc::new(AtomicUsize::new(0)),
            events: VecDeque::new(),
            end_events: false,
            stats: HostStats::default(),
        }
    }
}

impl Addressable for ScriptedHost {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn listen_addrs(&self) -> Vec<Multiaddr> {
        self.addrs.clone()
    }
}

#[async_trait]
impl RelayHost for ScriptedHost {
    fn attach_relay(&mut self, _limits: &RelayLimits) -> Result<(), HostError> {
        if self.fail_attach {
            return Err(HostError::InvalidRelayLimits {
                reason: "simulated".to_string(),
            });
        }
        self.attached = true;
        Ok(())
    }

    fn relay_attached(&self) -> bool {
        self.attached
    }

    fn stats(&self) -> HostStats {
        self.stats
    }

    async fn next_event(&mut self) -> Option<HostEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.end_events {
            return None;
        }
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), HostError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed {
            return Err(HostError::AlreadyClosed);
        }
        match self.close_behaviour {
            CloseBehaviour::Succeed => {
                self.closed = true;
                self.attached = false;
                Ok(())
            }
            CloseBehaviour::Fail => Err(HostError::Close {
                reason: "simulated".to_string(),
            }),
            CloseBehaviour::Hang => std::future::pending().await,
        }
    }
}

/// Helper: a shutdown future that fires after `after`.
async fn signal_after(after: Duration) -> ShutdownSignal {
    tokio::time::sleep(after).await;
    ShutdownSignal::Terminate
}

#[tokio::test(start_paused = true)]
async fn test_reports_every_interval_until_signal() {
    let host = ScriptedHost::new();
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    supervisor
        .run(signal_after(Duration::from_secs(12)))
        .await
        .unwrap();

    // Reports at t = 0, 5 and 10 seconds.
    assert_eq!(supervisor.metrics().status_reports.get(), 3);
    assert_eq!(supervisor.state(), NodeState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_first_report_is_immediate_and_non_empty() {
    let host = ScriptedHost::new();
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();
    assert_eq!(supervisor.enable_relay(), RelayStatus::Attached);

    let report = supervisor.report_status();
    assert!(!report.listen_addrs.is_empty());
    assert!(report.to_string().starts_with("Listen addresses: [/ip4/127.0.0.1/tcp/40001]"));

    supervisor
        .run(signal_after(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(supervisor.metrics().status_reports.get(), 2);
    assert_eq!(supervisor.metrics().listen_addrs.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_degraded_relay_keeps_reporting_and_shuts_down() {
    let mut host = ScriptedHost::new();
    host.fail_attach = true;
    let close_calls = host.close_calls.clone();
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    assert_eq!(supervisor.enable_relay(), RelayStatus::Degraded);
    assert!(!supervisor.host().relay_attached());

    supervisor
        .run(signal_after(Duration::from_secs(11)))
        .await
        .unwrap();

    assert_eq!(supervisor.metrics().status_reports.get(), 3);
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(supervisor.state(), NodeState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_run_enables_relay_when_starting() {
    let host = ScriptedHost::new();
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();
    assert_eq!(supervisor.state(), NodeState::Starting);

    supervisor
        .run(signal_after(Duration::from_millis(10)))
        .await
        .unwrap();
    assert_eq!(supervisor.metrics().status_reports.get(), 1);
    // The scripted host drops the relay on close.
    assert!(!supervisor.host().relay_attached());
}

#[test]
fn test_start_without_addresses_fails() {
    let mut host = ScriptedHost::new();
    host.addrs.clear();
    let result = Supervisor::with_host(host, &NodeConfig::default());
    assert!(matches!(result, Err(NodeError::NoListenAddrs)));
}

#[test]
fn test_start_with_zero_interval_fails() {
    let mut config = NodeConfig::default();
    config.status.interval_secs = 0;
    let result = Supervisor::with_host(ScriptedHost::new(), &config);
    assert!(matches!(result, Err(NodeError::ConfigError { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_signal_is_observed_within_one_interval() {
    let host = ScriptedHost::new();
    let close_calls = host.close_calls.clone();
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    let started = Instant::now();
    supervisor
        .run(signal_after(Duration::from_secs(7)))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(7));
    assert!(elapsed < Duration::from_secs(7 + 5));
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_failure_is_fatal() {
    let mut host = ScriptedHost::new();
    host.close_behaviour = CloseBehaviour::Fail;
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    let result = supervisor.run(signal_after(Duration::from_secs(1))).await;
    assert!(matches!(
        result,
        Err(NodeError::Host(HostError::Close { .. }))
    ));
    assert_eq!(supervisor.state(), NodeState::ShuttingDown);
}

#[tokio::test(start_paused = true)]
async fn test_hung_close_times_out() {
    let mut host = ScriptedHost::new();
    host.close_behaviour = CloseBehaviour::Hang;
    let mut config = NodeConfig::default();
    config.shutdown.timeout_secs = 3;
    let mut supervisor = Supervisor::with_host(host, &config).unwrap();

    let started = Instant::now();
    let result = supervisor.run(signal_after(Duration::from_secs(1))).await;
    assert!(matches!(result, Err(NodeError::ShutdownTimeout { .. })));
    assert!(started.elapsed() >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_already_closed_host_is_not_an_error() {
    let mut host = ScriptedHost::new();
    host.closed = true;
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    assert!(supervisor.shutdown().await.is_ok());
    assert_eq!(supervisor.state(), NodeState::Terminated);
    // Second shutdown does not touch the host again.
    assert!(supervisor.shutdown().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_run_after_shutdown_is_rejected() {
    let mut supervisor =
        Supervisor::with_host(ScriptedHost::new(), &NodeConfig::default()).unwrap();
    supervisor.shutdown().await.unwrap();
    let result = supervisor.run(signal_after(Duration::from_secs(1))).await;
    assert!(matches!(
        result,
        Err(NodeError::Host(HostError::NodeClosed))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_host_events_update_metrics() {
    let mut host = ScriptedHost::new();
    let client = PeerId::random();
    let target = PeerId::random();
    host.events.extend([
        HostEvent::PeerConnected(client),
        HostEvent::ReservationAccepted {
            peer: client,
            renewed: false,
        },
        HostEvent::CircuitOpened {
            src: target,
            dst: client,
        },
        HostEvent::CircuitDenied {
            src: target,
            dst: client,
        },
    ]);
    host.stats = HostStats {
        connected_peers: 1,
        active_reservations: 1,
        active_circuits: 1,
    };
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    supervisor
        .run(signal_after(Duration::from_secs(1)))
        .await
        .unwrap();

    let metrics = supervisor.metrics();
    assert_eq!(metrics.reservations_accepted.get(), 1);
    assert_eq!(metrics.circuits_accepted.get(), 1);
    assert_eq!(metrics.circuits_denied.get(), 1);
    assert_eq!(metrics.connected_peers.get(), 1);
    assert_eq!(metrics.active_circuits.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ended_event_stream_keeps_reporting() {
    let mut host = ScriptedHost::new();
    host.end_events = true;
    let mut supervisor = Supervisor::with_host(host, &NodeConfig::default()).unwrap();

    supervisor
        .run(signal_after(Duration::from_secs(6)))
        .await
        .unwrap();
    assert_eq!(supervisor.metrics().status_reports.get(), 2);
    assert_eq!(supervisor.state(), NodeState::Terminated);
}

//! Scheduling Integration Tests for pingwatch
//!
//! Drives the supervisor and its loops with scripted probers and a paused
//! clock, asserting on the real Prometheus metrics.

use std::sync::Arc;
use std::time::Duration;

use pingwatch::{
    Cadence, LoopState, MonitorError, PingMetrics, ProbeError, ProbeOutcome, ProbeRequest, Prober,
    Supervisor, Target,
};
use prometheus::Registry;
use tokio::sync::Mutex;
use tokio::time::Instant;

// =============================================================================
// Test Helpers
// =============================================================================

/// Answers per address: "down" errors, "slow" hangs for a minute, anything
/// else replies after 5ms. Records every request.
#[derive(Default)]
struct FakeNetwork {
    requests: Mutex<Vec<(String, u64, Instant)>>,
}

impl FakeNetwork {
    async fn requests_for(&self, address: &str) -> Vec<(u64, Instant)> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|(a, _, _)| a == address)
            .map(|(_, seq, at)| (*seq, *at))
            .collect()
    }
}

#[async_trait::async_trait]
impl Prober for FakeNetwork {
    async fn probe(&self, request: &ProbeRequest<'_>) -> ProbeOutcome {
        self.requests.lock().await.push((
            request.address.to_string(),
            request.sequence,
            Instant::now(),
        ));
        match request.address {
            "down" => ProbeOutcome::Error(ProbeError::Network("host unreachable".to_string())),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                ProbeOutcome::Timeout
            }
            _ => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ProbeOutcome::Success(Duration::from_millis(5))
            }
        }
    }
}

fn cadence(secs: u64) -> Cadence {
    Cadence::new(Duration::from_secs(secs)).unwrap()
}

// =============================================================================
// Supervisor Lifecycle Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_supervisor_runs_until_cancelled() {
    let network = Arc::new(FakeNetwork::default());
    let registry = Registry::new();
    let metrics = PingMetrics::new(&registry).unwrap();

    let mut supervisor = Supervisor::new(network.clone(), metrics.clone());
    supervisor
        .add_target(Target::new("up", "up").with_count(3), cadence(1))
        .unwrap();
    supervisor
        .add_target(Target::new("down", "down").with_count(2), cadence(2))
        .unwrap();

    let shutdown = supervisor.shutdown_token();
    let task = tokio::spawn(async move {
        let report = supervisor.run().await;
        (supervisor, report)
    });

    tokio::time::sleep(Duration::from_millis(4500)).await;
    shutdown.cancel();
    let (supervisor, report) = task.await.unwrap();
    let report = report.unwrap();

    assert_eq!(report.stopped, 2);
    assert!(report.is_clean());
    assert!(
        supervisor
            .loops()
            .iter()
            .all(|l| l.state() == LoopState::Idle && l.is_terminated())
    );

    // "up": cycles at 0..=4s, 3 probes each.
    let up = metrics.for_target("up", "up");
    assert_eq!(up.requests.get(), 15);
    assert_eq!(up.responses.get(), 15);
    assert_eq!(up.latency.get_sample_count(), 15);
    assert!((up.response_time.get() - 0.005).abs() < 1e-9);

    // "down": cycles at 0, 2 and 4s, every probe an error.
    let down = metrics.for_target("down", "down");
    assert_eq!(down.requests.get(), 6);
    assert_eq!(down.errors.get(), 6);
    assert_eq!(down.response_time.get(), -1.0);
    assert_eq!(down.latency.get_sample_count(), 0);

    // Each target numbers its own probes.
    let seqs: Vec<u64> = network
        .requests_for("down")
        .await
        .iter()
        .map(|(seq, _)| *seq)
        .collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_loop_does_not_block_shutdown_of_others() {
    let network = Arc::new(FakeNetwork::default());
    let metrics = PingMetrics::new(&Registry::new()).unwrap();

    let mut supervisor =
        Supervisor::new(network.clone(), metrics).with_grace(Duration::from_millis(200));
    supervisor
        .add_target(
            Target::new("slow", "slow").with_timeout(Duration::from_secs(60)),
            cadence(1),
        )
        .unwrap();
    supervisor
        .add_target(Target::new("fast", "fast"), cadence(1))
        .unwrap();

    supervisor.start_all().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let started = Instant::now();
    let report = supervisor.stop_all().await;

    assert_eq!(report.stopped, 1);
    assert_eq!(report.timed_out, vec!["slow".to_string()]);
    assert!(report.failed.is_empty());
    // Loops are stopped concurrently: one grace period, not one per loop.
    assert!(started.elapsed() < Duration::from_millis(400));

    let slow = &supervisor.loops()[0];
    assert_eq!(slow.state(), LoopState::Stopping);
    assert!(!slow.is_terminated());
    assert_eq!(supervisor.loops()[1].state(), LoopState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_sleep_exits_without_new_cycle() {
    let network = Arc::new(FakeNetwork::default());
    let metrics = PingMetrics::new(&Registry::new()).unwrap();

    let mut supervisor = Supervisor::new(network.clone(), metrics);
    supervisor
        .add_target(Target::new("up", "up").with_count(1), cadence(10))
        .unwrap();

    supervisor.start_all().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let started = Instant::now();
    let report = supervisor.stop_all().await;

    assert!(report.is_clean());
    // The sleep is interrupted immediately.
    assert!(started.elapsed() < Duration::from_millis(10));
    assert_eq!(network.requests_for("up").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_starts_are_drift_compensated() {
    let network = Arc::new(FakeNetwork::default());
    let metrics = PingMetrics::new(&Registry::new()).unwrap();

    let mut supervisor = Supervisor::new(network.clone(), metrics);
    // 5 probes x 5ms = 25ms per cycle.
    supervisor
        .add_target(Target::new("up", "up").with_count(5), cadence(1))
        .unwrap();

    supervisor.start_all().unwrap();
    tokio::time::sleep(Duration::from_millis(5500)).await;
    supervisor.stop_all().await;

    let requests = network.requests_for("up").await;
    let cycle_starts: Vec<Instant> = requests
        .iter()
        .filter(|(seq, _)| seq % 5 == 0)
        .map(|(_, at)| *at)
        .collect();

    assert_eq!(cycle_starts.len(), 6);
    let first = cycle_starts[0];
    for (i, start) in cycle_starts.iter().enumerate() {
        let offset = *start - first;
        let expected = Duration::from_secs(i as u64);
        assert!(
            offset >= expected && offset < expected + Duration::from_millis(10),
            "cycle {i} started at {offset:?}, expected {expected:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let network = Arc::new(FakeNetwork::default());
    let metrics = PingMetrics::new(&Registry::new()).unwrap();

    let mut supervisor = Supervisor::new(network.clone(), metrics);
    supervisor
        .add_target(Target::new("up", "up").with_count(1), cadence(1))
        .unwrap();

    supervisor.start_all().unwrap();
    assert!(matches!(
        supervisor.start_all(),
        Err(MonitorError::AlreadyRunning { .. })
    ));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(supervisor.stop_all().await.is_clean());

    supervisor.start_all().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(supervisor.stop_all().await.is_clean());

    let seqs: Vec<u64> = network
        .requests_for("up")
        .await
        .iter()
        .map(|(seq, _)| *seq)
        .collect();
    assert_eq!(seqs, vec![0, 1]);
}

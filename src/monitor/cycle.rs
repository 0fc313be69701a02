//! One measurement round against a target.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::{MetricsSink, NO_DATA_RESPONSE_TIME};
use crate::prober::{ProbeOutcome, ProbeRequest, Prober};

use super::target::Target;

/// Aggregated result of one probe cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleSummary {
    pub successes: u32,
    pub timeouts: u32,
    pub errors: u32,
    /// Mean over success latencies and timeout durations, in seconds.
    /// `None` when every probe errored.
    pub mean_response_time: Option<f64>,
}

impl CycleSummary {
    /// Number of probes attempted.
    pub fn attempts(&self) -> u32 {
        self.successes + self.timeouts + self.errors
    }

    /// Value written to the response-time gauge.
    pub fn response_time(&self) -> f64 {
        self.mean_response_time.unwrap_or(NO_DATA_RESPONSE_TIME)
    }
}

/// Runs `count` sequential probes against one target and folds the outcomes
/// into its metrics sink.
///
/// The sequence counter is shared by clones, so a cycle handed to a new loop
/// task keeps numbering where the previous task stopped.
#[derive(Clone)]
pub struct ProbeCycle {
    target: Arc<Target>,
    prober: Arc<dyn Prober>,
    sink: Arc<dyn MetricsSink>,
    sequence: Arc<AtomicU64>,
}

impl ProbeCycle {
    pub fn new(target: Target, prober: Arc<dyn Prober>, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            target: Arc::new(target),
            prober,
            sink,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Sequence number the next probe will use.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Perform one cycle.
    ///
    /// Never fails: every probe is attempted regardless of earlier outcomes.
    pub async fn run(&self) -> CycleSummary {
        let target = &*self.target;
        tracing::debug!(name = %target.name, address = %target.address, count = target.count, "Running cycle");

        let mut summary = CycleSummary::default();
        let mut samples = Vec::with_capacity(target.count as usize);

        for _ in 0..target.count {
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            self.sink.inc_requests();

            let request = ProbeRequest {
                address: &target.address,
                timeout: target.timeout,
                ttl: target.ttl,
                payload_size: target.payload_size,
                sequence: seq,
            };

            let outcome = self.prober.probe(&request).await;
            let label = outcome.as_str();
            match outcome {
                ProbeOutcome::Success(rtt) => {
                    let seconds = rtt.as_secs_f64();
                    tracing::debug!(name = %target.name, address = %target.address, seq, outcome = label, latency_ms = seconds * 1000.0, "Ping reply");
                    self.sink.inc_responses();
                    self.sink.observe_latency(seconds);
                    samples.push(seconds);
                    summary.successes += 1;
                }
                ProbeOutcome::Timeout => {
                    tracing::debug!(name = %target.name, address = %target.address, seq, outcome = label, timeout_ms = target.timeout.as_millis(), "Ping timed out");
                    self.sink.inc_timeouts();
                    // Timeouts count toward the mean at the full wait.
                    samples.push(target.timeout.as_secs_f64());
                    summary.timeouts += 1;
                }
                ProbeOutcome::Error(e) => {
                    tracing::debug!(name = %target.name, address = %target.address, seq, outcome = label, error = %e, "Ping failed");
                    self.sink.inc_errors();
                    summary.errors += 1;
                }
            }
        }

        if !samples.is_empty() {
            summary.mean_response_time = Some(samples.iter().sum::<f64>() / samples.len() as f64);
        }
        self.sink.set_response_time(summary.response_time());

        tracing::info!(
            name = %target.name,
            address = %target.address,
            attempts = summary.attempts(),
            successes = summary.successes,
            timeouts = summary.timeouts,
            errors = summary.errors,
            response_time = summary.response_time(),
            "Cycle complete"
        );
        summary
    }
}

impl std::fmt::Debug for ProbeCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeCycle")
            .field("target", &self.target)
            .field("next_sequence", &self.next_sequence())
            .finish_non_exhaustive()
    }
}

//! Supervisor fanning out one scheduling loop per target.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::metrics::PingMetrics;
use crate::prober::Prober;

use super::cycle::ProbeCycle;
use super::error::MonitorError;
use super::schedule::{DEFAULT_SHUTDOWN_GRACE, LoopId, LoopStatus, ScheduleLoop};
use super::target::{Cadence, Target};

/// Read-only view of one supervised target.
#[derive(Debug, Clone)]
pub struct TargetHandle {
    pub id: LoopId,
    pub name: String,
    pub address: String,
    pub interval: Duration,
    pub status: watch::Receiver<LoopStatus>,
}

impl TargetHandle {
    /// Snapshot suitable for JSON responses.
    pub fn snapshot(&self) -> TargetSnapshot {
        let status = self.status.borrow().clone();
        TargetSnapshot {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            interval: humantime::format_duration(self.interval).to_string(),
            running: status.running,
            last_execution: status.last_execution,
            cycles: status.cycles,
            overflows: status.overflows,
        }
    }
}

/// Serializable state of one target at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSnapshot {
    pub id: LoopId,
    pub name: String,
    pub address: String,
    pub interval: String,
    pub running: bool,
    pub last_execution: Option<chrono::DateTime<chrono::Utc>>,
    pub cycles: u64,
    pub overflows: u64,
}

/// Outcome of stopping every loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Loops confirmed stopped.
    pub stopped: usize,
    /// Loops still finishing a cycle when their grace period elapsed.
    pub timed_out: Vec<String>,
    /// Loops whose task panicked.
    pub failed: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.timed_out.is_empty() && self.failed.is_empty()
    }
}

/// Owns every scheduling loop and their shared collaborators.
///
/// Loops are identified by their position in insertion order.
pub struct Supervisor {
    prober: Arc<dyn Prober>,
    metrics: PingMetrics,
    grace: Duration,
    loops: Vec<ScheduleLoop>,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(prober: Arc<dyn Prober>, metrics: PingMetrics) -> Self {
        Self {
            prober,
            metrics,
            grace: DEFAULT_SHUTDOWN_GRACE,
            loops: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Set the stop grace period for loops added afterwards.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Register a target. Its loop is created idle.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidTarget` if the target fails validation.
    pub fn add_target(&mut self, target: Target, cadence: Cadence) -> Result<LoopId, MonitorError> {
        target.validate()?;

        let id = LoopId(self.loops.len());
        let sink = Arc::new(self.metrics.for_target(&target.name, &target.address));
        tracing::info!(loop_id = %id, name = %target.name, address = %target.address, "Initializing ping target");

        let cycle = ProbeCycle::new(target, Arc::clone(&self.prober), sink);
        self.loops
            .push(ScheduleLoop::new(id, cycle, cadence).with_grace(self.grace));
        Ok(id)
    }

    pub fn loops(&self) -> &[ScheduleLoop] {
        &self.loops
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Token that ends [`Supervisor::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handles for status reporting.
    pub fn targets(&self) -> Vec<TargetHandle> {
        self.loops
            .iter()
            .map(|l| TargetHandle {
                id: l.id(),
                name: l.name().to_string(),
                address: l.cycle().target().address.clone(),
                interval: l.cadence().interval(),
                status: l.subscribe(),
            })
            .collect()
    }

    /// Start every loop.
    ///
    /// # Errors
    /// Fails fast on the first loop that cannot start.
    pub fn start_all(&mut self) -> Result<(), MonitorError> {
        for schedule in &mut self.loops {
            schedule.start()?;
        }
        tracing::info!(count = self.loops.len(), "All loops started");
        Ok(())
    }

    /// Stop every loop concurrently.
    ///
    /// A loop that misses its grace period does not hold up the others.
    pub async fn stop_all(&mut self) -> ShutdownReport {
        let results = join_all(self.loops.iter_mut().map(|schedule| async move {
            let name = schedule.name().to_string();
            (name, schedule.stop().await)
        }))
        .await;

        let mut report = ShutdownReport::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.stopped += 1,
                Err(MonitorError::StopTimeout { .. }) => report.timed_out.push(name),
                Err(e) => {
                    tracing::error!(name = %name, error = %e, "Failed to stop loop");
                    report.failed.push(name);
                }
            }
        }

        if report.is_clean() {
            tracing::info!(stopped = report.stopped, "All loops stopped");
        } else {
            tracing::warn!(
                stopped = report.stopped,
                timed_out = ?report.timed_out,
                failed = ?report.failed,
                "Some loops did not stop cleanly"
            );
        }
        report
    }

    /// Start all loops, wait for the shutdown token, then stop all loops.
    pub async fn run(&mut self) -> Result<ShutdownReport, MonitorError> {
        self.start_all()?;
        self.shutdown.cancelled().await;
        tracing::info!("Shutting down loops...");
        Ok(self.stop_all().await)
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("grace", &self.grace)
            .field("loops", &self.loops)
            .finish_non_exhaustive()
    }
}

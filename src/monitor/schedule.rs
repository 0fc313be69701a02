//! Per-target scheduling loop.
//!
//! A [`ScheduleLoop`] drives one [`ProbeCycle`] at a fixed cadence anchored to
//! cycle start: the time a cycle takes is subtracted from the following
//! sleep. A cycle that overruns the interval is followed immediately by the
//! next one; missed cycles are never caught up.
//!
//! Cancellation is observed only between cycles. A cycle in progress when
//! [`ScheduleLoop::stop`] is called runs to completion, so shutdown can take
//! up to `timeout * count` for the slowest target.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::cycle::ProbeCycle;
use super::error::MonitorError;
use super::target::Cadence;

/// Default grace period for `stop()` (5 seconds).
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Identity assigned by the supervisor, stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LoopId(pub usize);

impl std::fmt::Display for LoopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loop-{}", self.0)
    }
}

/// Lifecycle state of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No task is running.
    Idle,
    /// The task is running cycles.
    Running,
    /// Stop was requested but the task has not exited yet.
    Stopping,
}

/// Progress published by the loop task.
///
/// Reset by every `start()`: the counters cover the current run only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopStatus {
    /// Whether the task is currently inside its loop body. Cleared on every
    /// exit path, including a panic.
    pub running: bool,
    /// Wall-clock start of the most recent cycle.
    pub last_execution: Option<DateTime<Utc>>,
    /// Completed cycles in the current run.
    pub cycles: u64,
    /// Cycles in the current run that took longer than the interval.
    pub overflows: u64,
}

/// Owned by the loop task; clears `running` when the task exits or unwinds.
struct RunningGuard(Arc<watch::Sender<LoopStatus>>);

impl RunningGuard {
    fn enter(status: Arc<watch::Sender<LoopStatus>>) -> Self {
        status.send_modify(|s| s.running = true);
        Self(status)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.running = false);
    }
}

struct ActiveLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    stop_requested: bool,
}

/// Drives probe cycles for one target until stopped.
pub struct ScheduleLoop {
    id: LoopId,
    cycle: ProbeCycle,
    cadence: Cadence,
    grace: Duration,
    status: Arc<watch::Sender<LoopStatus>>,
    active: Option<ActiveLoop>,
}

impl ScheduleLoop {
    pub fn new(id: LoopId, cycle: ProbeCycle, cadence: Cadence) -> Self {
        let (status, _) = watch::channel(LoopStatus::default());
        Self {
            id,
            cycle,
            cadence,
            grace: DEFAULT_SHUTDOWN_GRACE,
            status: Arc::new(status),
            active: None,
        }
    }

    /// Set how long `stop()` waits for the task to exit.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.cycle.target().name
    }

    pub fn cycle(&self) -> &ProbeCycle {
        &self.cycle
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        match &self.active {
            None => LoopState::Idle,
            Some(active) if active.handle.is_finished() => LoopState::Idle,
            Some(active) if active.stop_requested => LoopState::Stopping,
            Some(_) => LoopState::Running,
        }
    }

    /// Whether the task has actually exited, as opposed to merely having
    /// been asked to stop.
    pub fn is_terminated(&self) -> bool {
        self.active
            .as_ref()
            .is_none_or(|active| active.handle.is_finished())
    }

    /// Watch the status published by the loop task.
    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    /// Spawn the loop task and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `MonitorError::AlreadyRunning` if the loop is running.
    /// - `MonitorError::StopPending` if a previous stop timed out and the task
    ///   is still finishing its cycle.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if let Some(active) = &self.active {
            if !active.handle.is_finished() {
                let name = self.name().to_string();
                return Err(if active.stop_requested {
                    MonitorError::StopPending { name }
                } else {
                    MonitorError::AlreadyRunning { name }
                });
            }
        }

        // Fresh state per run; the previous task, if any, has exited.
        self.status.send_replace(LoopStatus::default());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.id,
            self.cycle.clone(),
            self.cadence,
            cancel.clone(),
            Arc::clone(&self.status),
        ));
        self.active = Some(ActiveLoop {
            cancel,
            handle,
            stop_requested: false,
        });

        tracing::info!(loop_id = %self.id, name = %self.name(), cadence = %self.cadence, "Loop started");
        Ok(())
    }

    /// Signal the task to stop and wait up to the grace period for it to exit.
    ///
    /// Stopping an idle loop is a no-op. Calling `stop()` again after a
    /// timeout waits for another grace period.
    ///
    /// # Errors
    /// - `MonitorError::StopTimeout` (non-fatal) if the task is still running
    ///   when the grace period elapses. The task is not aborted.
    /// - `MonitorError::LoopFailed` if the task panicked.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(loop_id = %self.id, "Loop not running; nothing to stop");
            return Ok(());
        };

        active.stop_requested = true;
        active.cancel.cancel();

        let joined = tokio::time::timeout(self.grace, &mut active.handle).await;
        let name = self.name().to_string();
        match joined {
            Ok(Ok(())) => {
                self.active = None;
                tracing::info!(loop_id = %self.id, name = %name, "Loop stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                self.active = None;
                tracing::error!(loop_id = %self.id, name = %name, error = %e, "Loop task failed");
                Err(MonitorError::LoopFailed {
                    name,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(loop_id = %self.id, name = %name, grace = ?self.grace, "Loop failed to terminate in time");
                Err(MonitorError::StopTimeout {
                    name,
                    grace: self.grace,
                })
            }
        }
    }
}

impl Drop for ScheduleLoop {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for ScheduleLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleLoop")
            .field("id", &self.id)
            .field("cycle", &self.cycle)
            .field("cadence", &self.cadence)
            .field("grace", &self.grace)
            .field("state", &self.state())
            .finish()
    }
}

/// Loop body: one cycle per interval, measured from cycle start.
async fn run_loop(
    id: LoopId,
    cycle: ProbeCycle,
    cadence: Cadence,
    cancel: CancellationToken,
    status: Arc<watch::Sender<LoopStatus>>,
) {
    let interval = cadence.interval();
    let address = cycle.target().address.clone();
    tracing::debug!(loop_id = %id, address = %address, interval = ?interval, "BEGIN loop");
    let _running = RunningGuard::enter(Arc::clone(&status));

    while !cancel.is_cancelled() {
        let cycle_start = Instant::now();
        status.send_modify(|s| s.last_execution = Some(Utc::now()));

        cycle.run().await;

        let next_deadline = cycle_start + interval;
        let sleep = match next_deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => {
                tracing::warn!(
                    loop_id = %id,
                    address = %address,
                    elapsed_ms = cycle_start.elapsed().as_millis(),
                    interval_ms = interval.as_millis(),
                    "Cycle time exceeded loop interval; overflow"
                );
                status.send_modify(|s| s.overflows += 1);
                Duration::ZERO
            }
        };
        status.send_modify(|s| s.cycles += 1);

        tracing::debug!(loop_id = %id, address = %address, next_step_ms = sleep.as_millis(), "Cycle finished");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(loop_id = %id, "Received exit signal");
                break;
            }
            _ = tokio::time::sleep(sleep) => {}
        }
    }

    tracing::debug!(loop_id = %id, address = %address, "END loop");
}

//! Monitor error types.

use std::time::Duration;

use thiserror::Error;

/// Structural errors raised by targets, loops and the supervisor.
///
/// Probe failures are not represented here: they are absorbed by the probe
/// cycle and surface only as metrics and logs.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Target parameters violate an invariant.
    #[error("invalid target '{name}': {reason}")]
    InvalidTarget { name: String, reason: String },

    /// Interval must be non-zero.
    #[error("invalid cadence: interval must be non-zero")]
    InvalidCadence,

    /// `start()` was called on a loop that is already running.
    #[error("loop '{name}' is already running")]
    AlreadyRunning { name: String },

    /// `start()` was called while a previous stop has not been confirmed.
    #[error("loop '{name}' has not finished stopping")]
    StopPending { name: String },

    /// The loop task did not exit within the grace period. Non-fatal.
    #[error("loop '{name}' failed to terminate within {grace:?}")]
    StopTimeout { name: String, grace: Duration },

    /// The loop task panicked or was cancelled by the runtime.
    #[error("loop '{name}' failed: {reason}")]
    LoopFailed { name: String, reason: String },
}

//! Monitor Layer
//!
//! Per-target probe scheduling. Each target gets its own Tokio task that runs
//! probe cycles at a fixed cadence and writes outcomes to its metrics sink.
//!
//! # Architecture
//!
//! - [`Target`] / [`Cadence`]: What to probe and how often
//! - [`ProbeCycle`]: One round of `count` sequential probes
//! - [`ScheduleLoop`]: Drift-compensated cadence with start/stop lifecycle
//! - [`Supervisor`]: One loop per target, driven by a cancellation token
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pingwatch::{Cadence, IcmpProber, PingMetrics, Supervisor, Target};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = prometheus::Registry::new();
//! let metrics = PingMetrics::new(&registry)?;
//! let mut supervisor = Supervisor::new(Arc::new(IcmpProber::new()), metrics);
//! supervisor.add_target(
//!     Target::new("cloudflare", "1.1.1.1"),
//!     Cadence::new(Duration::from_secs(30))?,
//! )?;
//!
//! let shutdown = supervisor.shutdown_token();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     shutdown.cancel();
//! });
//! supervisor.run().await?;
//! # Ok(())
//! # }
//! ```

mod cycle;
mod error;
mod schedule;
mod supervisor;
mod target;

pub use cycle::{CycleSummary, ProbeCycle};
pub use error::MonitorError;
pub use schedule::{DEFAULT_SHUTDOWN_GRACE, LoopId, LoopState, LoopStatus, ScheduleLoop};
pub use supervisor::{ShutdownReport, Supervisor, TargetHandle, TargetSnapshot};
pub use target::{
    Cadence, DEFAULT_COUNT, DEFAULT_PAYLOAD_SIZE, DEFAULT_TIMEOUT, DEFAULT_TTL, MAX_PAYLOAD_SIZE,
    Target,
};

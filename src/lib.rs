//! pingwatch - multi-target ICMP reachability monitor
//!
//! This crate periodically pings every configured host, records latency,
//! timeouts and errors per target, and exposes them as Prometheus metrics.
//! It can be used as a library, or run as a standalone binary with the
//! `pingwatch` executable.
//!
//! # Architecture
//!
//! - **Prober**: One ICMP echo round-trip, classified as success/timeout/error
//! - **Metrics**: Per-target counters, gauge and latency histogram
//! - **Monitor**: Probe cycles, drift-compensated scheduling loops, supervisor
//! - **Config**: YAML configuration with per-target overrides
//! - **Server**: `/metrics` scrape endpoint plus health and status APIs

pub mod config;
pub mod metrics;
pub mod monitor;
pub mod prober;
pub mod server;

pub use config::{AppConfig, ConfigError};
pub use metrics::{MetricsSink, PingMetrics, TargetMetrics};
pub use monitor::{
    Cadence, CycleSummary, LoopId, LoopState, LoopStatus, MonitorError, ProbeCycle, ScheduleLoop,
    ShutdownReport, Supervisor, Target,
};
pub use prober::{IcmpProber, ProbeError, ProbeOutcome, ProbeRequest, Prober};

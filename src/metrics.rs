//! Metrics Layer
//!
//! Per-target counters, gauge and latency histogram backed by the
//! `prometheus` crate.
//!
//! - [`MetricsSink`]: Update contract used by probe cycles
//! - [`PingMetrics`]: Metric families registered on a [`prometheus::Registry`]
//! - [`TargetMetrics`]: Label-bound handle for one `(name, address)` pair
//! - [`encode`]: Text exposition for scraping

mod registry;
mod sink;

pub use registry::{PingMetrics, TargetMetrics, encode};
pub use sink::{MetricsSink, NO_DATA_RESPONSE_TIME};

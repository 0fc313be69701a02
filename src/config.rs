//! Configuration module for pingwatch.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Global probe defaults (interval, timeout, count, ttl, payload size)
//! - Per-target overrides
//! - Metrics endpoint bind address and port

mod app;
mod env;
mod error;

pub use app::{AppConfig, DEFAULT_INTERVAL, DEFAULT_METRICS_PORT, MetricsConfig, TargetConfig};
pub use env::{expand_env_vars, parse_duration};
pub use error::ConfigError;

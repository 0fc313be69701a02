//! Application configuration structures.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::{
    Cadence, DEFAULT_COUNT, DEFAULT_PAYLOAD_SIZE, DEFAULT_SHUTDOWN_GRACE, DEFAULT_TTL, Target,
};

use super::env::expand_env_vars;
use super::error::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default cycle interval (60 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default metrics endpoint port.
pub const DEFAULT_METRICS_PORT: u16 = 9056;

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn default_ttl() -> u8 {
    DEFAULT_TTL
}

fn default_payload_size() -> usize {
    DEFAULT_PAYLOAD_SIZE
}

fn default_shutdown_grace() -> Duration {
    DEFAULT_SHUTDOWN_GRACE
}

// =============================================================================
// Metrics Endpoint Configuration
// =============================================================================

/// Metrics HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Bind address (default: "0.0.0.0").
    pub address: String,

    /// Port (default: 9056).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: DEFAULT_METRICS_PORT,
        }
    }
}

// =============================================================================
// Target Configuration
// =============================================================================

/// One target entry. Unset fields fall back to the global values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Unique target name, used as the `name` metric label.
    pub name: String,

    /// Hostname or IP address.
    pub address: String,

    /// Cycle interval override (e.g., "30s").
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    /// Probe timeout override (e.g., "2s").
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Probes per cycle override.
    #[serde(default)]
    pub count: Option<u32>,

    /// Hop limit override.
    #[serde(default)]
    pub ttl: Option<u8>,

    /// Payload size override in bytes.
    #[serde(default)]
    pub payload_size: Option<usize>,
}

impl TargetConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            interval: None,
            timeout: None,
            count: None,
            ttl: None,
            payload_size: None,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global cycle interval (default: 60s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Global probe timeout (default: half the target's interval).
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Probes per cycle (default: 3).
    #[serde(default = "default_count")]
    pub count: u32,

    /// Hop limit (default: 64).
    #[serde(default = "default_ttl")]
    pub ttl: u8,

    /// Echo payload size in bytes (default: 56).
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// How long shutdown waits for each loop (default: 5s).
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,

    /// Tracing filter directive (e.g., "info,pingwatch=debug").
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Metrics endpoint configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Monitored targets.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: None,
            count: DEFAULT_COUNT,
            ttl: DEFAULT_TTL,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            log_filter: None,
            metrics: MetricsConfig::default(),
            targets: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded first.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(&expand_env_vars(content)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.metrics_addr()?;

        if self.metrics.port == 0 {
            return Err(ConfigError::ValidationError(
                "metrics port must be non-zero".to_string(),
            ));
        }

        if self.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "interval must be non-zero".to_string(),
            ));
        }

        if self.shutdown_grace.is_zero() {
            return Err(ConfigError::ValidationError(
                "shutdown_grace must be non-zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if !names.insert(target.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate target name: '{}'",
                    target.name
                )));
            }
        }

        // Checks every resolved target invariant (timeout, count, ttl, ...).
        self.resolve_targets()?;

        Ok(())
    }

    /// Socket address for the metrics endpoint.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self.metrics.address.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid metrics address: '{}'",
                self.metrics.address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.metrics.port))
    }

    /// Resolve every target entry against the global defaults.
    ///
    /// Fallback order per field: target value, global value, built-in default.
    /// Without any timeout configured, the timeout is half the interval.
    pub fn resolve_targets(&self) -> Result<Vec<(Target, Cadence)>, ConfigError> {
        self.targets
            .iter()
            .map(|entry| {
                let interval = entry.interval.unwrap_or(self.interval);
                let timeout = entry.timeout.or(self.timeout).unwrap_or(interval / 2);

                let target = Target::new(&entry.name, &entry.address)
                    .with_timeout(timeout)
                    .with_count(entry.count.unwrap_or(self.count))
                    .with_ttl(entry.ttl.unwrap_or(self.ttl))
                    .with_payload_size(entry.payload_size.unwrap_or(self.payload_size));

                let invalid = |e: crate::monitor::MonitorError| {
                    ConfigError::ValidationError(format!("target '{}': {}", entry.name, e))
                };
                target.validate().map_err(invalid)?;
                let cadence = Cadence::new(interval).map_err(invalid)?;

                Ok((target, cadence))
            })
            .collect()
    }
}

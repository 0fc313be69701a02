//! Probe targets and cadence.

use std::time::Duration;

use super::error::MonitorError;

/// Default probe timeout (5 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default IP hop limit.
pub const DEFAULT_TTL: u8 = 64;

/// Default echo payload size in bytes.
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

/// Default number of probes per cycle.
pub const DEFAULT_COUNT: u32 = 3;

/// Largest payload that still fits an IPv4 datagram with ICMP header.
pub const MAX_PAYLOAD_SIZE: usize = 65_500;

/// One monitored host and its probe parameters.
///
/// Immutable once a loop has been built around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Human-readable label.
    pub name: String,
    /// Hostname or IP address, resolved per probe.
    pub address: String,
    /// Per-probe deadline.
    pub timeout: Duration,
    /// IP hop limit.
    pub ttl: u8,
    /// Echo payload size in bytes.
    pub payload_size: usize,
    /// Probes per cycle.
    pub count: u32,
}

impl Target {
    /// Create a target with default probe parameters.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            ttl: DEFAULT_TTL,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            count: DEFAULT_COUNT,
        }
    }

    /// Set the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the hop limit.
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the payload size.
    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    /// Set the number of probes per cycle.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Validate the target.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidTarget` on an empty name or address,
    /// a zero timeout, ttl or count, or an oversized payload.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let invalid = |reason: &str| MonitorError::InvalidTarget {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(invalid("address must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout must be non-zero"));
        }
        if self.ttl == 0 {
            return Err(invalid("ttl must be at least 1"));
        }
        if self.count == 0 {
            return Err(invalid("count must be at least 1"));
        }
        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(invalid("payload_size exceeds 65500 bytes"));
        }
        Ok(())
    }
}

/// Time between the starts of consecutive cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    interval: Duration,
}

impl Cadence {
    /// Create a cadence.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidCadence` for a zero interval.
    pub fn new(interval: Duration) -> Result<Self, MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidCadence);
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "every {}", humantime::format_duration(self.interval))
    }
}

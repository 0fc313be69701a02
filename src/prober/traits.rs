//! Core prober traits and types.

use std::time::Duration;

use thiserror::Error;

/// Errors that classify a failed probe.
///
/// These never escape a probe cycle: they are counted as `errors` and logged.
/// "No reply within the deadline" is not an error, see [`ProbeOutcome::Timeout`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The address could not be resolved to an IP address.
    #[error("failed to resolve '{address}': {reason}")]
    Resolve { address: String, reason: String },

    /// The ICMP socket could not be created (usually missing privileges).
    #[error("socket error: {0}")]
    Socket(String),

    /// Unreachable destination, malformed reply or other transport failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Result of one individual probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Echo reply received after the given round-trip time.
    Success(Duration),
    /// No reply within the probe timeout.
    Timeout,
    /// Any other failure.
    Error(ProbeError),
}

impl ProbeOutcome {
    /// Short label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Timeout => "timeout",
            Self::Error(_) => "error",
        }
    }
}

/// Parameters for one echo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest<'a> {
    /// Hostname or IP address, resolved per probe.
    pub address: &'a str,
    /// Deadline for the reply.
    pub timeout: Duration,
    /// IP hop limit.
    pub ttl: u8,
    /// Echo payload size in bytes.
    pub payload_size: usize,
    /// Per-target sequence number.
    pub sequence: u64,
}

/// Capability to send one ICMP echo and classify the result.
///
/// Implementations must not fail for ordinary network problems
/// (unreachable, filtered, DNS failure): those are [`ProbeOutcome::Error`].
/// A missing reply must be reported as [`ProbeOutcome::Timeout`].
#[async_trait::async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Perform one echo round-trip.
    async fn probe(&self, request: &ProbeRequest<'_>) -> ProbeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(
            ProbeOutcome::Success(Duration::from_millis(3)).as_str(),
            "success"
        );
        assert_eq!(ProbeOutcome::Timeout.as_str(), "timeout");
        assert_eq!(
            ProbeOutcome::Error(ProbeError::Network("unreachable".to_string())).as_str(),
            "error"
        );
    }

    #[test]
    fn test_probe_error_display() {
        let err = ProbeError::Resolve {
            address: "nope.invalid".to_string(),
            reason: "no addresses found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to resolve 'nope.invalid': no addresses found"
        );
    }
}

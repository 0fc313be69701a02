//! Metrics sink contract.

/// Response-time value meaning "no usable sample in this cycle".
///
/// Using -1.0 to distinguish from a valid 0s response time.
pub const NO_DATA_RESPONSE_TIME: f64 = -1.0;

/// Per-target metric updates produced by a probe cycle.
///
/// Implementations are bound to one `(name, address)` label pair for the
/// whole process lifetime and must tolerate concurrent updates from other
/// targets' tasks. All time values are in seconds.
pub trait MetricsSink: Send + Sync + 'static {
    /// One echo request was sent.
    fn inc_requests(&self);

    /// One echo reply was received.
    fn inc_responses(&self);

    /// One probe failed with an error other than a timeout.
    fn inc_errors(&self);

    /// One probe got no reply within its timeout.
    fn inc_timeouts(&self);

    /// Mean response time of the most recent cycle, or
    /// [`NO_DATA_RESPONSE_TIME`].
    fn set_response_time(&self, seconds: f64);

    /// Round-trip time of one successful probe.
    fn observe_latency(&self, seconds: f64);
}

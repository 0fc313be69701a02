//! Prometheus metric families for ping targets.

use prometheus::{
    Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use super::sink::MetricsSink;

const REQUESTS: &str = "ping_requests_total";
const RESPONSES: &str = "ping_responses_total";
const ERRORS: &str = "ping_errors_total";
const TIMEOUTS: &str = "ping_timeouts_total";
const RESPONSE_TIME: &str = "ping_response_time_seconds";
const LATENCY: &str = "ping_latency_seconds";

/// Label names shared by every family.
const LABELS: &[&str] = &["name", "address"];

/// Collection of ping metric families.
///
/// Created once per registry; hand out per-target handles with
/// [`PingMetrics::for_target`].
#[derive(Clone)]
pub struct PingMetrics {
    requests: IntCounterVec,
    responses: IntCounterVec,
    errors: IntCounterVec,
    timeouts: IntCounterVec,
    response_time: GaugeVec,
    latency: HistogramVec,
}

impl PingMetrics {
    /// Creates and registers all ping metric families with the registry.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let requests = IntCounterVec::new(Opts::new(REQUESTS, "Total ping requests sent"), LABELS)?;
        let responses =
            IntCounterVec::new(Opts::new(RESPONSES, "Total ping responses received"), LABELS)?;
        let errors = IntCounterVec::new(Opts::new(ERRORS, "Total ping errors"), LABELS)?;
        let timeouts = IntCounterVec::new(Opts::new(TIMEOUTS, "Total ping timeouts"), LABELS)?;
        let response_time = GaugeVec::new(
            Opts::new(
                RESPONSE_TIME,
                "Mean response time of the most recent cycle, timeouts priced at the timeout (-1 when no data)",
            ),
            LABELS,
        )?;
        // 0.5ms - ~4s
        let latency = HistogramVec::new(
            HistogramOpts::new(LATENCY, "Round-trip time of successful pings")
                .buckets(prometheus::exponential_buckets(0.0005, 2.0, 14)?),
            LABELS,
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(responses.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(timeouts.clone()))?;
        registry.register(Box::new(response_time.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            requests,
            responses,
            errors,
            timeouts,
            response_time,
            latency,
        })
    }

    /// Bind all families to one target's labels.
    pub fn for_target(&self, name: &str, address: &str) -> TargetMetrics {
        let labels = [name, address];
        TargetMetrics {
            requests: self.requests.with_label_values(&labels),
            responses: self.responses.with_label_values(&labels),
            errors: self.errors.with_label_values(&labels),
            timeouts: self.timeouts.with_label_values(&labels),
            response_time: self.response_time.with_label_values(&labels),
            latency: self.latency.with_label_values(&labels),
        }
    }
}

impl std::fmt::Debug for PingMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingMetrics").finish_non_exhaustive()
    }
}

/// Metrics for a single `(name, address)` pair.
#[derive(Clone)]
pub struct TargetMetrics {
    pub requests: IntCounter,
    pub responses: IntCounter,
    pub errors: IntCounter,
    pub timeouts: IntCounter,
    pub response_time: Gauge,
    pub latency: Histogram,
}

impl std::fmt::Debug for TargetMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetMetrics")
            .field("requests", &self.requests.get())
            .field("responses", &self.responses.get())
            .field("errors", &self.errors.get())
            .field("timeouts", &self.timeouts.get())
            .field("response_time", &self.response_time.get())
            .field("latency_count", &self.latency.get_sample_count())
            .finish()
    }
}

impl MetricsSink for TargetMetrics {
    fn inc_requests(&self) {
        self.requests.inc();
    }

    fn inc_responses(&self) {
        self.responses.inc();
    }

    fn inc_errors(&self) {
        self.errors.inc();
    }

    fn inc_timeouts(&self) {
        self.timeouts.inc();
    }

    fn set_response_time(&self, seconds: f64) {
        self.response_time.set(seconds);
    }

    fn observe_latency(&self, seconds: f64) {
        self.latency.observe(seconds);
    }
}

/// Render every family in the registry in the Prometheus text format.
pub fn encode(registry: &Registry) -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(&registry.gather())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_metrics_update() {
        let registry = Registry::new();
        let metrics = PingMetrics::new(&registry).unwrap();
        let target = metrics.for_target("t1", "localhost");

        target.inc_requests();
        target.inc_requests();
        target.inc_responses();
        target.inc_timeouts();
        target.set_response_time(0.25);
        target.observe_latency(0.01);

        assert_eq!(target.requests.get(), 2);
        assert_eq!(target.responses.get(), 1);
        assert_eq!(target.timeouts.get(), 1);
        assert_eq!(target.errors.get(), 0);
        assert_eq!(target.response_time.get(), 0.25);
        assert_eq!(target.latency.get_sample_count(), 1);
    }

    #[test]
    fn test_labels_are_stable_per_target() {
        let registry = Registry::new();
        let metrics = PingMetrics::new(&registry).unwrap();

        metrics.for_target("t1", "10.0.0.1").inc_requests();
        metrics.for_target("t1", "10.0.0.1").inc_requests();
        metrics.for_target("t2", "10.0.0.2").inc_requests();

        assert_eq!(metrics.for_target("t1", "10.0.0.1").requests.get(), 2);
        assert_eq!(metrics.for_target("t2", "10.0.0.2").requests.get(), 1);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        PingMetrics::new(&registry).unwrap();
        assert!(PingMetrics::new(&registry).is_err());
    }

    #[test]
    fn test_exposed_family_names() {
        let registry = Registry::new();
        let metrics = PingMetrics::new(&registry).unwrap();
        let target = metrics.for_target("t1", "localhost");
        target.inc_requests();
        target.inc_responses();
        target.inc_errors();
        target.inc_timeouts();
        target.set_response_time(0.01);
        target.observe_latency(0.01);

        let text = encode(&registry).unwrap();
        for (family, kind) in [
            ("ping_requests_total", "counter"),
            ("ping_responses_total", "counter"),
            ("ping_errors_total", "counter"),
            ("ping_timeouts_total", "counter"),
            ("ping_response_time_seconds", "gauge"),
            ("ping_latency_seconds", "histogram"),
        ] {
            assert!(
                text.contains(&format!("# TYPE {family} {kind}")),
                "missing {family} in:\n{text}"
            );
        }
        assert!(!text.contains("ping_reponse_time"));
        assert!(!text.contains("ping_observations"));
    }

    #[test]
    fn test_encode_text_format() {
        let registry = Registry::new();
        let metrics = PingMetrics::new(&registry).unwrap();
        let target = metrics.for_target("google-dns", "8.8.8.8");
        target.inc_requests();
        target.set_response_time(-1.0);

        let text = encode(&registry).unwrap();
        assert!(text.contains("# TYPE ping_requests_total counter"));
        let line = |family: &str| {
            text.lines()
                .find(|l| l.starts_with(family) && l.contains(r#"name="google-dns""#))
                .unwrap_or_else(|| panic!("missing {family} sample in:\n{text}"))
                .to_string()
        };
        assert!(line("ping_requests_total{").ends_with(" 1"));
        assert!(line("ping_response_time_seconds{").ends_with(" -1"));
        assert!(line("ping_requests_total{").contains(r#"address="8.8.8.8""#));
    }
}

//! Prometheus metrics for the sanitize service.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

/// Label set for request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// Sanitizer outcome label, `bad_request`, or `error`.
    pub outcome: String,
}

/// Prometheus metrics for the sanitize service.
pub struct SanitizerMetrics {
    registry: Registry,
    /// Total `/sanitize` requests by outcome.
    pub requests_total: Family<RequestLabels, Counter>,
    /// Total statements removed across all requests.
    pub statements_removed_total: Counter,
    /// Time spent inside the sanitizer.
    pub sanitize_duration_seconds: Histogram,
}

impl Default for SanitizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SanitizerMetrics {
    /// Create the metrics and register them with a fresh registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "navguard_requests",
            "Sanitize requests by outcome",
            requests_total.clone(),
        );

        let statements_removed_total = Counter::default();
        registry.register(
            "navguard_statements_removed",
            "Navigation-redirect statements removed",
            statements_removed_total.clone(),
        );

        let sanitize_duration_seconds =
            Histogram::new([0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0].into_iter());
        registry.register(
            "navguard_sanitize_duration_seconds",
            "Time spent sanitizing one request",
            sanitize_duration_seconds.clone(),
        );

        Self {
            registry,
            requests_total,
            statements_removed_total,
            sanitize_duration_seconds,
        }
    }

    /// Record a request that reached the sanitizer.
    pub fn record_sanitize(&self, outcome: &str, removed: usize, duration_secs: f64) {
        self.record_request(outcome);
        self.statements_removed_total.inc_by(removed as u64);
        self.sanitize_duration_seconds.observe(duration_secs);
    }

    /// Record a request outcome without sanitizer timing.
    pub fn record_request(&self, outcome: &str) {
        let labels = RequestLabels {
            outcome: outcome.to_string(),
        };
        self.requests_total.get_or_create(&labels).inc();
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

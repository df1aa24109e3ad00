//! Request instrumentation using prometheus-client.
//!
//! Every request is counted and timed per `(method, path)` label pair.
//! The raw request path is used as the label value; nothing bounds the
//! number of distinct paths.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Classic Prometheus client default buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Labels for request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub path: String,
}

impl RequestLabels {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

/// Collects and stores request metrics.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsCollectorInner>,
}

struct MetricsCollectorInner {
    /// Total requests counter.
    requests_total: Family<RequestLabels, Counter>,
    /// Request duration histogram (in seconds).
    request_duration_seconds: Family<RequestLabels, Histogram>,
    /// The prometheus registry.
    registry: Registry,
}

impl MetricsCollector {
    /// Create a new collector with its own registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::default())
    }

    /// Create a collector registering into an existing registry, so the
    /// application can expose its own metrics alongside.
    pub fn with_registry(mut registry: Registry) -> Self {
        let requests_total = Family::<RequestLabels, Counter>::default();
        let request_duration_seconds =
            Family::<RequestLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DEFAULT_BUCKETS.into_iter())
            });

        registry.register(
            "http_requests",
            "Total number of HTTP requests",
            requests_total.clone(),
        );
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            request_duration_seconds.clone(),
        );

        Self {
            inner: Arc::new(MetricsCollectorInner {
                requests_total,
                request_duration_seconds,
                registry,
            }),
        }
    }

    /// Get the prometheus registry for encoding.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Start instrumenting a request.
    ///
    /// Logs the request, increments its counter, and returns a guard that
    /// observes the elapsed time exactly once, on [`RequestGuard::finish`]
    /// or on drop.
    pub fn begin_request(&self, method: &str, path: &str, remote: impl Display) -> RequestGuard {
        info!(method = %method, path = %path, remote = %remote, "received request");

        let labels = RequestLabels::new(method, path);
        self.inner.requests_total.get_or_create(&labels).inc();
        let histogram = self
            .inner
            .request_duration_seconds
            .get_or_create(&labels)
            .clone();

        RequestGuard {
            histogram: Some(histogram),
            start: Instant::now(),
        }
    }

    /// Encode the registry in the text exposition format.
    ///
    /// Reads only. With no requests observed the output still declares
    /// both metric families.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, self.registry())?;
        Ok(buffer)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that records a request's duration when released.
#[must_use = "dropping the guard immediately records a near-zero duration"]
pub struct RequestGuard {
    histogram: Option<Histogram>,
    start: Instant,
}

impl RequestGuard {
    /// Get the elapsed duration.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record the duration and consume the guard.
    pub fn finish(mut self) -> Duration {
        self.observe()
    }

    fn observe(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if let Some(histogram) = self.histogram.take() {
            histogram.observe(elapsed.as_secs_f64());
        }
        elapsed
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.observe();
    }
}

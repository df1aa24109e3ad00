//! Request instrumentation and metrics exposition.

mod collector;
mod server;

pub use collector::{DEFAULT_BUCKETS, MetricsCollector, RequestGuard, RequestLabels};
pub use server::{MetricsServer, OPENMETRICS_CONTENT_TYPE};

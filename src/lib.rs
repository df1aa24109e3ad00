//! rustplate - an application scaffold
//!
//! Wires together:
//! - Layered configuration (flags, environment, file, defaults)
//! - Structured logging with development and production encodings
//! - Per-request counting and timing with a Prometheus endpoint

pub mod config;
pub mod metrics;
pub mod util;

pub use config::{ConfigLoader, ConfigResolver};
pub use metrics::MetricsCollector;

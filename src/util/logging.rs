//! Logging initialization.

use thiserror::Error;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logger construction failed. The process cannot run without a logger.
#[derive(Debug, Error)]
#[error("failed to initialize logging: {0}")]
pub struct LoggerInitError(#[from] TryInitError);

/// Output encoding, fixed at initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogMode {
    /// Colorized human-readable output at debug level.
    #[default]
    Development,
    /// JSON output at info level.
    Production,
}

impl LogMode {
    pub fn from_production(production: bool) -> Self {
        if production {
            LogMode::Production
        } else {
            LogMode::Development
        }
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_level(&self) -> &'static str {
        match self {
            LogMode::Development => "debug",
            LogMode::Production => "info",
        }
    }
}

/// Initialize the global logging subscriber.
///
/// Records go to stderr so stdout stays free for command output.
/// `RUST_LOG` overrides the mode's default level. Fails if a global
/// subscriber is already installed.
pub fn init_logging(mode: LogMode) -> Result<(), LoggerInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(mode.default_level()));

    let registry = tracing_subscriber::registry().with(filter);

    match mode {
        LogMode::Development => registry
            .with(fmt::layer().pretty().with_ansi(true).with_writer(std::io::stderr))
            .try_init()?,
        LogMode::Production => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mode_from_flag() {
        assert_eq!(LogMode::from_production(true), LogMode::Production);
        assert_eq!(LogMode::from_production(false), LogMode::Development);
        assert_eq!(LogMode::default(), LogMode::Development);
    }

    #[test]
    fn test_default_levels() {
        assert_eq!(LogMode::Development.default_level(), "debug");
        assert_eq!(LogMode::Production.default_level(), "info");
    }

    // Only one global subscriber per process: the second init must fail
    #[test]
    fn test_second_init_fails() {
        let _ = init_logging(LogMode::Production);
        assert!(init_logging(LogMode::Development).is_err());
    }
}

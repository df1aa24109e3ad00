//! Utility functions and helpers.

mod logging;
#[cfg(test)]
pub(crate) mod testing;

pub use logging::{LogMode, LoggerInitError, init_logging};

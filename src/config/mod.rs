//! Layered configuration: flags, environment, file and defaults.

mod env;
mod loader;
mod resolver;
mod types;

pub use loader::{ConfigError, SEARCH_FORMATS, file_format, find_config_file, load_config_file};
pub use resolver::{ConfigLoader, ConfigResolver};
pub use types::*;

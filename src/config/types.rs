//! Configuration data types.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;

/// Well-known configuration keys.
pub mod keys {
    /// Directory the application reads its input from.
    pub const INPUT_DIR: &str = "configs.inputDir";
    /// Directory the application writes its output to.
    pub const OUTPUT_DIR: &str = "configs.outputDir";
    /// Socket address of the metrics server. Empty disables it.
    pub const METRICS_ADDRESS: &str = "metrics.address";
    /// HTTP path the exposition endpoint is served on.
    pub const METRICS_PATH: &str = "metrics.path";
}

/// Default path for the metrics endpoint.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Directory searched for a configuration file when none is given.
pub const DEFAULT_SEARCH_PATH: &str = "configs";

/// Base name (without extension) of the configuration file.
pub const DEFAULT_CONFIG_NAME: &str = "configs";

/// Where a resolved value came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Flag,
    Env,
    File,
    Default,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Flag => "flag",
            ConfigSource::Env => "env",
            ConfigSource::File => "file",
            ConfigSource::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resolved setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValue {
    /// Dot-namespaced key as requested.
    pub key: String,
    /// Winning value.
    pub value: String,
    /// Layer that provided the value.
    pub source: ConfigSource,
}

impl ConfigValue {
    /// Whether the value is empty (unset everywhere, or set to "").
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Outcome of the configuration file load.
///
/// `Loaded` and `NotFound` both leave the resolver fully usable; only
/// `Failed` records an error, and even then flags, environment and
/// defaults still resolve.
#[derive(Debug)]
pub enum FileState {
    /// A file was read and parsed.
    Loaded(PathBuf),
    /// No file was given and none was found on the search path.
    NotFound,
    /// The file could not be read or parsed.
    Failed(ConfigError),
}

impl FileState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FileState::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileState::Failed(_))
    }
}

/// Typed view of the input/output directory settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directories {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Directories {
    pub(crate) fn from_values(input: &ConfigValue, output: &ConfigValue) -> Self {
        let to_path = |v: &ConfigValue| (!v.is_empty()).then(|| PathBuf::from(&v.value));
        Self {
            input_dir: to_path(input),
            output_dir: to_path(output),
        }
    }
}

//! Environment variable layer.
//!
//! Variables are collected once by `config::Environment` without a
//! separator, so `CONFIGS_INPUTDIR` is indexed as `configs_inputdir` and
//! matches the key `configs.inputDir`.

use crate::config::loader::index_layer;
use config::{Config, Environment, Map};
use std::collections::HashMap;

/// Index under which a key's environment variable is stored: ASCII
/// lowercase, with `.` and `-` as `_`.
pub(crate) fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Snapshot the environment, or the given variables instead.
///
/// With a prefix only `PREFIX_*` variables are kept, prefix stripped.
/// Empty values count as unset unless `allow_empty` is set.
pub(crate) fn load_env_layer(
    prefix: Option<&str>,
    allow_empty: bool,
    vars: Option<HashMap<String, String>>,
) -> Result<HashMap<String, String>, config::ConfigError> {
    let mut source = match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => Environment::with_prefix(prefix).prefix_separator("_"),
        None => Environment::default(),
    }
    .ignore_empty(!allow_empty);

    if let Some(vars) = vars {
        source = source.source(Some(vars.into_iter().collect::<Map<String, String>>()));
    }

    let layer = Config::builder().add_source(source).build()?;
    index_layer(&layer)
}

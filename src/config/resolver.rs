//! Layered configuration resolution.
//!
//! A [`ConfigLoader`] collects flag overrides, defaults and file search
//! settings. [`ConfigLoader::load`] reads the file and snapshots the
//! environment, then hands back a read-only [`ConfigResolver`]. Values are
//! never exposed before loading has finished, successfully or not.
//!
//! Precedence, highest first: explicit flag, environment variable,
//! configuration file, declared default (empty string when undeclared).

use crate::config::env::{env_key, load_env_layer};
use crate::config::loader::{find_config_file, load_config_file};
use crate::config::{
    ConfigError, ConfigSource, ConfigValue, DEFAULT_CONFIG_NAME, DEFAULT_SEARCH_PATH, Directories,
    FileState, keys,
};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::{debug, error};

/// Builder for a [`ConfigResolver`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    config_name: String,
    env_prefix: Option<String>,
    allow_empty_env: bool,
    env: Option<HashMap<String, String>>,
    flags: HashMap<String, String>,
    defaults: HashMap<String, String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader searching `configs/configs.<ext>` with no overrides.
    pub fn new() -> Self {
        Self {
            config_file: None,
            search_paths: vec![PathBuf::from(DEFAULT_SEARCH_PATH)],
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            env_prefix: None,
            allow_empty_env: false,
            env: None,
            flags: HashMap::new(),
            defaults: HashMap::new(),
        }
    }

    /// Use an explicit configuration file instead of searching.
    ///
    /// `None` keeps the search behavior, so an unset `--config` flag can be
    /// passed straight through.
    pub fn config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Replace the directories searched for the configuration file.
    pub fn search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Base name of the configuration file, without extension.
    pub fn config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    /// Prefix for environment variable names.
    pub fn env_prefix(mut self, prefix: Option<String>) -> Self {
        self.env_prefix = prefix;
        self
    }

    /// Treat empty environment variables as set.
    pub fn allow_empty_env(mut self, allow: bool) -> Self {
        self.allow_empty_env = allow;
        self
    }

    /// Use the given variables instead of the process environment.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Bind a flag to a key. Only flags the caller actually set (`Some`)
    /// take part in resolution.
    pub fn flag(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.flags.insert(normalize(key), value);
        }
        self
    }

    /// Declare the default value for a key.
    pub fn default_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.defaults.insert(normalize(key), value.into());
        self
    }

    /// Load the configuration file and snapshot the environment.
    ///
    /// Never fails: a missing file is logged at debug, an unreadable or
    /// malformed one at error, and in both cases the remaining layers still
    /// resolve. Inspect [`ConfigResolver::file_state`] to tell them apart.
    pub fn load(self) -> ConfigResolver {
        let (file, file_state) = self.load_file();

        match &file_state {
            FileState::Loaded(path) => {
                debug!(path = %path.display(), "using config file");
            }
            FileState::NotFound => {
                debug!(
                    name = %self.config_name,
                    search_paths = ?self.search_paths,
                    "no config file found"
                );
            }
            FileState::Failed(e) => {
                error!(error = %e, "error reading config file");
            }
        }

        let env = load_env_layer(self.env_prefix.as_deref(), self.allow_empty_env, self.env)
            .unwrap_or_else(|e| {
                error!(error = %e, "failed to read environment variables");
                HashMap::new()
            });

        ConfigResolver {
            flags: self.flags,
            env,
            file,
            defaults: self.defaults,
            file_state,
        }
    }

    /// Like [`load`](Self::load), but a file that failed to load is an error.
    pub fn load_strict(self) -> Result<ConfigResolver, ConfigError> {
        let resolver = self.load();
        if let FileState::Failed(e) = resolver.file_state {
            return Err(e);
        }
        Ok(resolver)
    }

    fn load_file(&self) -> (HashMap<String, String>, FileState) {
        let path = match &self.config_file {
            Some(path) => path.clone(),
            None => match find_config_file(&self.search_paths, &self.config_name) {
                Some(path) => path,
                None => return (HashMap::new(), FileState::NotFound),
            },
        };

        match load_config_file(&path) {
            Ok(values) => (values, FileState::Loaded(path)),
            Err(e) => (HashMap::new(), FileState::Failed(e)),
        }
    }
}

/// Read-only view over the resolved configuration layers.
#[derive(Debug)]
pub struct ConfigResolver {
    flags: HashMap<String, String>,
    env: HashMap<String, String>,
    file: HashMap<String, String>,
    defaults: HashMap<String, String>,
    file_state: FileState,
}

impl ConfigResolver {
    /// Resolve a key to its winning value and source.
    ///
    /// Keys are matched ASCII case-insensitively in every layer. A key
    /// absent from every layer resolves to the empty string with source
    /// [`ConfigSource::Default`].
    pub fn resolve(&self, key: &str) -> ConfigValue {
        let normalized = normalize(key);

        let (value, source) = if let Some(v) = self.flags.get(&normalized) {
            (v.as_str(), ConfigSource::Flag)
        } else if let Some(v) = self.env.get(&env_key(key)) {
            (v.as_str(), ConfigSource::Env)
        } else if let Some(v) = self.file.get(&normalized) {
            (v.as_str(), ConfigSource::File)
        } else {
            let v = self.defaults.get(&normalized).map_or("", String::as_str);
            (v, ConfigSource::Default)
        };

        ConfigValue {
            key: key.to_string(),
            value: value.to_string(),
            source,
        }
    }

    /// Resolve a key and return only its value.
    pub fn get(&self, key: &str) -> String {
        self.resolve(key).value
    }

    /// Resolve every key known to the flag, file or default layers,
    /// sorted by key.
    ///
    /// Environment-only settings are not listed since variable names
    /// cannot be mapped back to keys.
    pub fn resolved(&self) -> Vec<ConfigValue> {
        let keys: BTreeSet<&String> = self
            .flags
            .keys()
            .chain(self.file.keys())
            .chain(self.defaults.keys())
            .collect();
        keys.into_iter().map(|k| self.resolve(k)).collect()
    }

    /// Typed view of the input/output directory settings.
    pub fn directories(&self) -> Directories {
        Directories::from_values(
            &self.resolve(keys::INPUT_DIR),
            &self.resolve(keys::OUTPUT_DIR),
        )
    }

    /// Outcome of the configuration file load.
    pub fn file_state(&self) -> &FileState {
        &self.file_state
    }

    /// The configuration file in use, if one was loaded.
    pub fn config_file(&self) -> Option<&PathBuf> {
        match &self.file_state {
            FileState::Loaded(path) => Some(path),
            _ => None,
        }
    }

    /// The error recorded while loading the configuration file, if any.
    pub fn load_error(&self) -> Option<&ConfigError> {
        match &self.file_state {
            FileState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}

//! Configuration file discovery and loading.
//!
//! Files are read with the `config` crate, one `Config` per layer, then
//! indexed by lowercase dotted key so that `configs: { inputDir: x }`
//! becomes `configs.inputdir = x`.

use config::{Config, File, FileFormat, FileStoredFormat, Map, Source, Value, ValueKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported configuration file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to load configuration file {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },
}

/// Formats tried, in order, when searching for a configuration file.
pub const SEARCH_FORMATS: [FileFormat; 3] = [FileFormat::Json, FileFormat::Toml, FileFormat::Yaml];

/// Detect the format of a file from its extension (case-insensitive).
pub fn file_format(path: &Path) -> Option<FileFormat> {
    let ext = path.extension()?.to_str()?;
    SEARCH_FORMATS.into_iter().find(|format| {
        format
            .file_extensions()
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext))
    })
}

/// Look for `<dir>/<name>.<ext>` across the search directories.
///
/// Directories are tried in order, and within a directory the extensions
/// of [`SEARCH_FORMATS`] in order. The first existing file wins.
pub fn find_config_file(search_paths: &[PathBuf], name: &str) -> Option<PathBuf> {
    search_paths.iter().find_map(|dir| {
        SEARCH_FORMATS
            .iter()
            .flat_map(|format| format.file_extensions())
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|candidate| candidate.is_file())
    })
}

/// Read a configuration file into key/value pairs.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, ConfigError> {
    let path = path.as_ref();

    let format =
        file_format(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let load_error = |source| ConfigError::Load {
        path: path.to_path_buf(),
        source,
    };

    let layer = Config::builder()
        .add_source(File::from(path).format(format).required(true))
        .build()
        .map_err(load_error)?;

    index_layer(&layer).map_err(load_error)
}

/// Index every string-valued setting of a layer by lowercase dotted key.
///
/// Scalars are rendered as strings; nulls and sequences have no string
/// value and are skipped.
pub(crate) fn index_layer(layer: &Config) -> Result<HashMap<String, String>, config::ConfigError> {
    let mut values = HashMap::new();
    index_table(None, layer.collect()?, &mut values);
    Ok(values)
}

fn index_table(prefix: Option<&str>, table: Map<String, Value>, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{}", key.to_ascii_lowercase()),
            None => key.to_ascii_lowercase(),
        };

        if let ValueKind::Table(child) = value.kind {
            index_table(Some(&key), child, out);
            continue;
        }
        if matches!(value.kind, ValueKind::Nil | ValueKind::Array(_)) {
            continue;
        }
        if let Ok(s) = value.into_string() {
            out.insert(key, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml_config() {
        let file = write_file(
            ".yaml",
            r#"
configs:
  inputDir: /etc/in
  outputDir: /etc/out
metrics:
  port: 9090
  enabled: true
"#,
        );

        let values = load_config_file(file.path()).unwrap();
        assert_eq!(values["configs.inputdir"], "/etc/in");
        assert_eq!(values["configs.outputdir"], "/etc/out");
        assert_eq!(values["metrics.port"], "9090");
        assert_eq!(values["metrics.enabled"], "true");
    }

    #[test]
    fn test_load_toml_config() {
        let file = write_file(
            ".toml",
            r#"
[configs]
inputDir = "/etc/in"
"#,
        );

        let values = load_config_file(file.path()).unwrap();
        assert_eq!(values["configs.inputdir"], "/etc/in");
    }

    #[test]
    fn test_toml_datetime_is_a_string_value() {
        let file = write_file(".toml", "[configs]\nstarted = 1979-05-27\n");

        let values = load_config_file(file.path()).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["configs.started"], "1979-05-27");
    }

    #[test]
    fn test_load_json_config() {
        let file = write_file(".json", r#"{"configs": {"outputDir": "/etc/out"}}"#);

        let values = load_config_file(file.path()).unwrap();
        assert_eq!(values["configs.outputdir"], "/etc/out");
    }

    #[test]
    fn test_sequences_and_nulls_are_skipped() {
        let file = write_file(".yaml", "list: [1, 2]\nnothing: ~\nname: x\n");

        let values = load_config_file(file.path()).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["name"], "x");
    }

    #[test]
    fn test_empty_yaml_is_empty_table() {
        let file = write_file(".yml", "");
        assert!(load_config_file(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config_file("/nonexistent/path/configs.yaml");
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let file = write_file(".yaml", "not: valid: yaml: {{{}}}");
        assert!(matches!(
            load_config_file(file.path()).unwrap_err(),
            ConfigError::Load { .. }
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_file(".ini", "[configs]\ninputDir=/x\n");
        assert!(matches!(
            load_config_file(file.path()).unwrap_err(),
            ConfigError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_top_level_must_be_table() {
        let file = write_file(".json", "[1, 2, 3]");
        assert!(matches!(
            load_config_file(file.path()).unwrap_err(),
            ConfigError::Load { .. }
        ));
    }

    #[test]
    fn test_find_config_file_extension_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("configs.yaml"), "a: 1").unwrap();
        std::fs::write(dir.path().join("configs.toml"), "a = 1").unwrap();

        let found = find_config_file(&[dir.path().to_path_buf()], "configs").unwrap();
        assert_eq!(found, dir.path().join("configs.toml"));
    }

    #[test]
    fn test_find_config_file_search_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(second.path().join("configs.yml"), "a: 1").unwrap();

        let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let found = find_config_file(&paths, "configs").unwrap();
        assert_eq!(found, second.path().join("configs.yml"));
    }

    #[test]
    fn test_find_config_file_none() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file(&[dir.path().to_path_buf()], "configs").is_none());
    }

    #[test]
    fn test_file_format_from_extension() {
        assert_eq!(
            file_format(Path::new("a/configs.YML")),
            Some(FileFormat::Yaml)
        );
        assert_eq!(
            file_format(Path::new("configs.toml")),
            Some(FileFormat::Toml)
        );
        assert_eq!(file_format(Path::new("configs.ini")), None);
        assert_eq!(file_format(Path::new("configs")), None);
    }
}

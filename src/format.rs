//! Serialization formats for configuration files.
//!
//! Two formats are supported: YAML (human-readable, the default) and JSON.
//! The format of a file is always inferred from its extension; anything that
//! is not `.yml`/`.yaml` is treated as JSON.
//!
//! Encoding goes through `serde_json::Value` first so that every map, struct
//! fields included, is emitted with sorted keys. Output is therefore
//! deterministic for both formats and never contains YAML anchors.

use crate::config::{Config, ConfigLayer};
use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};

/// On-disk configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    pub fn of_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Json,
        }
    }

    /// Extension used when this crate names a file.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yml",
            ConfigFormat::Json => "json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid options: yaml, json", s)),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replace (or add) the extension of `path` with the one for `format`.
pub fn with_format_extension(path: &Path, format: ConfigFormat) -> PathBuf {
    path.with_extension(format.extension())
}

/// Encode a value in the given format.
pub fn encode<T: Serialize>(value: &T, format: ConfigFormat) -> ConfigResult<String> {
    let tree = serde_json::to_value(value).map_err(|e| ConfigError::serialize(format.as_str(), e))?;
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::to_string(&tree).map_err(|e| ConfigError::serialize(format.as_str(), e))
        }
        ConfigFormat::Json => {
            let mut text = serde_json::to_string_pretty(&tree)
                .map_err(|e| ConfigError::serialize(format.as_str(), e))?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// Decode `text` read from `path` in the given format.
///
/// An empty YAML document decodes as an empty mapping.
pub fn decode<T: DeserializeOwned>(text: &str, format: ConfigFormat, path: &Path) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => {
            let text = if text.trim().is_empty() { "{}" } else { text };
            serde_yaml::from_str(text).map_err(|e| ConfigError::invalid_format(path, "yaml", e))
        }
        ConfigFormat::Json => {
            serde_json::from_str(text).map_err(|e| ConfigError::invalid_format(path, "json", e))
        }
    }
}

/// Decode using the format implied by `path`.
pub fn decode_for_path<T: DeserializeOwned>(text: &str, path: &Path) -> ConfigResult<T> {
    decode(text, ConfigFormat::of_path(path), path)
}

/// Decode a whole configuration file.
///
/// The file is read as a layer and absent fields take their defaults, so
/// anything the resolver accepts as one link of the chain also loads alone.
pub fn decode_config(text: &str, format: ConfigFormat, path: &Path) -> ConfigResult<Config> {
    decode::<ConfigLayer>(text, format, path).map(ConfigLayer::into_config)
}

/// [`decode_config`] using the format implied by `path`.
pub fn decode_config_for_path(text: &str, path: &Path) -> ConfigResult<Config> {
    decode_config(text, ConfigFormat::of_path(path), path)
}

//! Structured error types for configuration operations.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Underlying codec error kept as the source of content errors.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Missing inputs
    NotFound,
    TemplateNotFound,

    // Conflicts
    AlreadyExists,

    // Content errors
    InvalidFormat,
    SerializeError,

    // I/O errors
    ReadError,
    WriteError,
}

/// Error raised by configuration resolution and persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file required for a read, backup or restore does not exist.
    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Initialization refused because the target already exists.
    #[error("configuration already exists at {} (use force to overwrite)", path.display())]
    AlreadyExists { path: PathBuf },

    /// Content could not be decoded in the format implied by the path.
    #[error("invalid {format} in {}: {source}", path.display())]
    InvalidFormat {
        path: PathBuf,
        format: &'static str,
        #[source]
        source: BoxedSource,
    },

    /// Failed to read an existing file.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to persist a file.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory configuration could not be encoded.
    #[error("failed to serialize configuration as {format}: {source}")]
    Serialize {
        format: &'static str,
        #[source]
        source: BoxedSource,
    },

    /// Unknown template id.
    #[error("template '{id}' not found. Available templates: {}", available.join(", "))]
    TemplateNotFound { id: String, available: Vec<String> },
}

impl ConfigError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    pub fn invalid_format(path: &Path, format: &'static str, source: impl Into<BoxedSource>) -> Self {
        Self::InvalidFormat {
            path: path.to_path_buf(),
            format,
            source: source.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn serialize(format: &'static str, source: impl Into<BoxedSource>) -> Self {
        Self::Serialize {
            format,
            source: source.into(),
        }
    }

    pub fn template_not_found(id: &str, available: Vec<String>) -> Self {
        Self::TemplateNotFound {
            id: id.to_string(),
            available,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::NotFound { .. } => ErrorCode::NotFound,
            ConfigError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            ConfigError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            ConfigError::Read { .. } => ErrorCode::ReadError,
            ConfigError::Write { .. } => ErrorCode::WriteError,
            ConfigError::Serialize { .. } => ErrorCode::SerializeError,
            ConfigError::TemplateNotFound { .. } => ErrorCode::TemplateNotFound,
        }
    }

    /// The file this error concerns, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::NotFound { path }
            | ConfigError::AlreadyExists { path }
            | ConfigError::InvalidFormat { path, .. }
            | ConfigError::Read { path, .. }
            | ConfigError::Write { path, .. } => Some(path),
            ConfigError::Serialize { .. } | ConfigError::TemplateNotFound { .. } => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_lists_ids() {
        let err = ConfigError::template_not_found(
            "unknown-template",
            vec!["advanced".into(), "default".into()],
        );
        let msg = err.to_string();
        assert!(msg.contains("unknown-template"));
        assert!(msg.contains("advanced, default"));
        assert_eq!(err.code(), ErrorCode::TemplateNotFound);
        assert!(err.path().is_none());
    }

    #[test]
    fn test_write_error_carries_path_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::write("/etc/agent.config.yml", io);
        assert!(err.to_string().contains("/etc/agent.config.yml"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.path(), Some(Path::new("/etc/agent.config.yml")));
    }

    #[test]
    fn test_invalid_format_keeps_codec_error() {
        let cause = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err = ConfigError::invalid_format(Path::new("/p/agent.config.json"), "json", cause);
        assert_eq!(err.code(), ErrorCode::InvalidFormat);
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
        assert!(err.to_string().contains(&source.to_string()));
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InvalidFormat).unwrap();
        assert_eq!(json, "\"INVALID_FORMAT\"");
    }
}

//! Error types for pipesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding or encoding pipeline documents.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not a valid document of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parse error on load, with the path of the offending file.
    #[error("failed to parse pipeline at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document decoded but carries an empty `name`.
    #[error("pipeline document has an empty name")]
    MissingName,

    /// Underlying I/O failure while reading a local artifact.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while assembling a [`crate::config::ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("host {0:?} must start with http:// or https://")]
    InvalidHost(String),
}

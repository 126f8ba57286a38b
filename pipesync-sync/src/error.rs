//! Error types for pipesync-sync.

use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use pipesync_client::ClientError;
use pipesync_core::{CodecError, PipelineName};

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the registry client, returned as the client reported it.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The local artifact could not be read or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote pipeline an operation needs does not exist.
    #[error("pipeline '{0}' does not exist on the registry")]
    NotFound(PipelineName),

    /// Neither an explicit run number nor the run history named a run.
    #[error("no run found for {scope} '{name}'")]
    RunNotFound { scope: &'static str, name: String },

    /// An explicit run number did not parse.
    #[error("invalid run number {value:?}: {source}")]
    InvalidRunNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// The report sink refused the write.
    #[error("could not write report: {0}")]
    Report(#[source] std::io::Error),

    /// JSON serialization error (sync report).
    #[error("report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// True when the registry rejected a write because of a name clash or a
    /// stale concurrency token.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Client(e) if e.is_conflict())
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

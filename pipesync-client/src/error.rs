//! Error types for pipesync-client.

use std::fmt;
use std::num::ParseIntError;

use thiserror::Error;

use pipesync_core::{CodecError, EnvironmentName, PipelineName};

use crate::transport::Method;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Boxed underlying cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured timeout elapsed before the exchange completed.
    #[error("{method} {url} timed out: {source}")]
    Timeout {
        method: Method,
        url: String,
        #[source]
        source: BoxError,
    },

    /// DNS, connect, TLS or mid-body I/O failure.
    #[error("{method} {url} failed: {source}")]
    Connection {
        method: Method,
        url: String,
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    /// Classify `source` as a timeout or a connection failure.
    pub fn classify(method: Method, url: impl Into<String>, source: BoxError) -> Self {
        let url = url.into();
        if chain_has_timeout(&*source) {
            TransportError::Timeout {
                method,
                url,
                source,
            }
        } else {
            TransportError::Connection {
                method,
                url,
                source,
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

fn chain_has_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Which optimistic-concurrency rule the registry enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Create collided with an existing pipeline of the same name.
    NameTaken,
    /// Update carried a token that no longer matches the registry's version.
    StaleToken,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::NameTaken => write!(f, "name already taken"),
            ConflictKind::StaleToken => write!(f, "stale concurrency token"),
        }
    }
}

/// All errors that can arise from registry and history operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("decode error: {0}")]
    Decode(#[from] CodecError),

    /// Registry rejected a write on concurrency grounds. Never retried here.
    #[error("conflict on pipeline '{pipeline}' ({kind}, status {status}): {message}")]
    Conflict {
        pipeline: PipelineName,
        kind: ConflictKind,
        status: u16,
        message: String,
    },

    #[error("unexpected status {status} from {method} {path}: {message}")]
    UnexpectedStatus {
        method: Method,
        path: String,
        status: u16,
        message: String,
    },

    #[error("pipeline '{0}' not found")]
    NotFound(PipelineName),

    #[error("pipeline '{0}' has no concurrency token")]
    MissingToken(PipelineName),

    /// Delete refused: the pipeline is still an environment member and
    /// detaching it failed. Nothing was deleted.
    #[error(
        "pipeline '{pipeline}' is still referenced by environment '{environment}' \
         and could not be removed from it: {source}"
    )]
    Integrity {
        pipeline: PipelineName,
        environment: EnvironmentName,
        #[source]
        source: Box<ClientError>,
    },

    /// Membership was removed but the pipeline delete itself failed.
    /// Retrying only the delete is enough.
    #[error(
        "pipeline '{pipeline}' was removed from environment '{environment}' \
         but deleting it failed: {source}"
    )]
    PartialDelete {
        pipeline: PipelineName,
        environment: EnvironmentName,
        #[source]
        source: Box<ClientError>,
    },

    #[error("no run history for pipeline '{0}'")]
    EmptyHistory(PipelineName),

    #[error("stage '{stage}' of pipeline '{pipeline}' has a non-numeric counter {counter:?}: {source}")]
    InvalidCounter {
        pipeline: PipelineName,
        stage: String,
        counter: String,
        #[source]
        source: ParseIntError,
    },
}

impl ClientError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(t) if t.is_timeout())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeout_is_classified_as_timeout() {
        let source: BoxError = Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "deadline",
        ));
        let err = TransportError::classify(Method::Get, "http://x/go", source);
        assert!(err.is_timeout());
    }

    #[test]
    fn timeout_wording_without_timeout_kind_is_connection() {
        let source: BoxError = Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "upstream said: operation timed out",
        ));
        let err = TransportError::classify(Method::Get, "http://x/go", source);
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_found_below_a_wrapping_error() {
        #[derive(Debug, Error)]
        #[error("request failed")]
        struct Wrapper(#[source] std::io::Error);

        let source: BoxError = Box::new(Wrapper(std::io::Error::from(
            std::io::ErrorKind::WouldBlock,
        )));
        let err = TransportError::classify(Method::Get, "http://x/go", source);
        assert!(err.is_timeout());
    }

    #[test]
    fn refused_is_classified_as_connection() {
        let source: BoxError = Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        let err = TransportError::classify(Method::Put, "http://x/go", source);
        assert!(!err.is_timeout());
        assert!(err.to_string().starts_with("PUT http://x/go failed"));
    }

    #[test]
    fn conflict_message_names_kind() {
        let err = ClientError::Conflict {
            pipeline: PipelineName::from("build"),
            kind: ConflictKind::StaleToken,
            status: 412,
            message: "etag mismatch".into(),
        };
        assert!(err.is_conflict());
        assert!(err.to_string().contains("stale concurrency token"));
    }
}

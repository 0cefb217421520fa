//! Error types for the sync agent.
//!
//! Library code returns `GridError`; the binary wraps it in `anyhow` at the edge.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while enrolling, reporting or geolocating.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success status from an endpoint whose failure aborts the caller.
    #[error("(status {status}) {body}")]
    Api { status: u16, body: String },

    #[error("enrollment response has no token field")]
    MissingToken,

    #[error("identity error: {0}")]
    Identity(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("capture error on {path}: {message}")]
    Capture { path: PathBuf, message: String },

    #[error("another pass holds the lock at {0}")]
    Locked(PathBuf),
}

impl GridError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GridError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn capture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GridError::Capture {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type GridResult<T> = Result<T, GridError>;

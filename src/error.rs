//! Error types for TierPlace
//!
//! The placement path itself never fails towards the host scheduler; these
//! errors surface from the building blocks (request parsing, queue queries,
//! configuration) and are recovered by the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for TierPlace operations
#[derive(Error, Debug)]
pub enum PlacementError {
    /// Burst-buffer specification could not be parsed
    #[error("Malformed storage request '{input}': {reason}")]
    MalformedRequest {
        /// Raw specification
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// The host scheduler could not be queried
    #[error("Queue query failed: {0}")]
    QueueQuery(String),

    /// I/O error while reading a file
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(String),
}

impl PlacementError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed request error
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a queue query error
    pub fn queue(message: impl Into<String>) -> Self {
        Self::QueueQuery(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error means the host scheduler was unreachable
    pub fn is_queue_failure(&self) -> bool {
        matches!(self, Self::QueueQuery(_) | Self::Io { .. })
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for TierPlace operations
pub type Result<T> = std::result::Result<T, PlacementError>;

impl From<std::io::Error> for PlacementError {
    fn from(err: std::io::Error) -> Self {
        PlacementError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PlacementError {
    fn from(err: serde_json::Error) -> Self {
        PlacementError::Json(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| PlacementError::io(path, e))
    }
}

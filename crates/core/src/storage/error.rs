//! Storage error types.

use thiserror::Error;

/// Blob directory errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A file already exists at the destination.
    #[error("file already exists: {path}")]
    AlreadyExists {
        /// Destination path.
        path: String,
    },

    /// The upload body could not be read to the end.
    #[error("upload body interrupted: {0}")]
    Interrupted(String),

    /// Filesystem operation failed.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create an already-exists error.
    #[must_use]
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

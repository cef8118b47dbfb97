//! Attachment error types.

use agora_shared::AppError;
use thiserror::Error;

use crate::storage::StorageError;

/// Attachment operation errors.
///
/// Field validation failures are not errors; see
/// [`UploadOutcome::Invalid`](super::UploadOutcome::Invalid).
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Post missing, or not editable by the caller.
    #[error("post not found")]
    PostNotFound,

    /// Attachment missing, or its post not editable by the caller.
    #[error("attachment not found")]
    NotFound,

    /// A file already exists where the upload would be written.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The upload body ended early or could not be read.
    #[error("upload interrupted: {0}")]
    Interrupted(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AttachmentError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<StorageError> for AttachmentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists { path } => Self::Conflict(path),
            StorageError::Interrupted(msg) => Self::Interrupted(msg),
            other @ StorageError::Operation(_) => Self::Storage(other),
        }
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::PostNotFound => Self::NotFound("Post not found".to_string()),
            AttachmentError::NotFound => Self::NotFound("Attachment not found".to_string()),
            AttachmentError::Conflict(_) => {
                Self::Conflict("Attachment file already exists".to_string())
            }
            AttachmentError::Interrupted(_) => {
                Self::BadRequest("Upload body could not be read".to_string())
            }
            AttachmentError::Storage(e) => Self::Storage(e.to_string()),
            AttachmentError::Repository(msg) => Self::Database(msg),
        }
    }
}

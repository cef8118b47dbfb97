//! Attachment types and data structures.

use std::collections::BTreeMap;

use agora_shared::{AttachmentId, PostId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::extension::extension_of;

/// The forum post an attachment belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: PostId,
    /// Author of the post.
    pub author_id: UserId,
    /// Post title.
    pub title: String,
}

/// Attachment domain model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAttachment {
    /// Unique identifier; also the file stem on disk.
    pub id: AttachmentId,
    /// Owning post.
    pub post_id: PostId,
    /// Public path, `/attachments/<id-hex><ext>`.
    pub path: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
}

impl PostAttachment {
    /// Extension of the stored file, including the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        extension_of(&self.path)
    }
}

/// Input for creating an attachment record.
#[derive(Debug, Clone)]
pub struct CreateAttachmentInput {
    /// Attachment ID.
    pub id: AttachmentId,
    /// Owning post.
    pub post_id: PostId,
    /// Public path.
    pub path: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
}

/// An uploaded file as received from the client.
#[derive(Debug)]
pub struct UploadedFile<B> {
    /// Claimed file name; untrusted.
    pub file_name: Option<String>,
    /// File content.
    pub body: B,
}

impl<B> UploadedFile<B> {
    /// Create an uploaded file.
    pub fn new(file_name: Option<String>, body: B) -> Self {
        Self { file_name, body }
    }
}

/// Validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Record a message for `field`.
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Whether no message was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }
}

/// Result of an upload attempt that passed the permission check.
#[derive(Debug)]
pub enum UploadOutcome {
    /// File written and row inserted.
    Created(PostAttachment),
    /// Field validation failed; nothing was written.
    Invalid {
        /// The target post, for re-displaying the form.
        post: Post,
        /// Field errors.
        errors: FieldErrors,
    },
}

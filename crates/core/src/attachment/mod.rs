//! Post attachment lifecycle.
//!
//! This module provides business logic for post attachments including:
//! - Upload validation against the extension allow-list
//! - Exclusive file creation paired with the metadata row
//! - Delete confirmation and deletion (file first, then row)
//! - Listing a post's attachments
//!
//! Every operation is gated by [`PostPermissions`](crate::permission::PostPermissions);
//! a post the caller may not edit is reported exactly like a missing one.

mod error;
mod extension;
mod service;
mod types;

#[cfg(test)]
mod extension_props;

pub use error::AttachmentError;
pub use extension::{
    ALLOWED_EXTENSIONS, FILE_FIELD, FILE_REQUIRED, PROHIBITED_FILE_TYPE, allowed_extension,
    extension_of,
};
pub use service::{AttachmentRepository, AttachmentService};
pub use types::{
    CreateAttachmentInput, FieldErrors, Post, PostAttachment, UploadOutcome, UploadedFile,
};

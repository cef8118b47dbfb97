//! Blob directory for attachment files.
//!
//! Files live flat under `<web_root>/attachments`, named `<id-hex><ext>`, and are
//! served back by the hosting layer at `/attachments/<id-hex><ext>`.

mod error;
mod service;

pub use error::StorageError;
pub use service::{ATTACHMENTS_DIR, BlobDirectory};

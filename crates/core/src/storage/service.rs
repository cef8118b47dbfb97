//! Blob directory implementation over `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use agora_shared::AttachmentId;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::warn;

use super::error::StorageError;

/// Directory under the web root holding attachment files; also the public URL prefix.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Flat directory of attachment files keyed by attachment id.
#[derive(Debug, Clone)]
pub struct BlobDirectory {
    root: PathBuf,
}

impl BlobDirectory {
    /// Create a blob directory rooted at `<web_root>/attachments`.
    #[must_use]
    pub fn new(web_root: impl AsRef<Path>) -> Self {
        Self {
            root: web_root.as_ref().join(ATTACHMENTS_DIR),
        }
    }

    /// Directory holding the files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn ensure_exists(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::operation(format!("mkdir {}: {e}", self.root.display())))
    }

    /// File name for an attachment: `<id-hex><ext>`.
    #[must_use]
    pub fn file_name(id: AttachmentId, extension: &str) -> String {
        format!("{}{extension}", id.hex())
    }

    /// Public relative path: `/attachments/<id-hex><ext>`.
    #[must_use]
    pub fn public_path(id: AttachmentId, extension: &str) -> String {
        format!("/{ATTACHMENTS_DIR}/{}", Self::file_name(id, extension))
    }

    /// On-disk location of an attachment file.
    #[must_use]
    pub fn disk_path(&self, id: AttachmentId, extension: &str) -> PathBuf {
        self.root.join(Self::file_name(id, extension))
    }

    /// Create the attachment file exclusively and stream `body` into it.
    ///
    /// Never overwrites: an existing file yields [`StorageError::AlreadyExists`].
    /// If the body cannot be copied in full, the partial file is removed.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists, the body read fails, or the write fails.
    pub async fn write_new<R>(
        &self,
        id: AttachmentId,
        extension: &str,
        body: R,
    ) -> Result<u64, StorageError>
    where
        R: AsyncRead + Send,
    {
        let path = self.disk_path(id, extension);

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::already_exists(path.display().to_string()));
            }
            Err(e) => {
                return Err(StorageError::operation(format!(
                    "create {}: {e}",
                    path.display()
                )));
            }
        };

        let mut body = std::pin::pin!(body);
        let copied = match tokio::io::copy(&mut body, &mut file).await {
            Ok(n) => file.flush().await.map(|()| n).map_err(|e| {
                StorageError::operation(format!("flush {}: {e}", path.display()))
            }),
            // Read-side failures are tagged InvalidData by the body adapter.
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                Err(StorageError::Interrupted(e.to_string()))
            }
            Err(e) => Err(StorageError::operation(format!(
                "write {}: {e}",
                path.display()
            ))),
        };

        if copied.is_err() {
            drop(file);
            discard(&path).await;
        }

        copied
    }

    /// Remove an attachment file.
    ///
    /// Returns `false` if there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the file being absent.
    pub async fn remove(&self, id: AttachmentId, extension: &str) -> Result<bool, StorageError> {
        let path = self.disk_path(id, extension);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::operation(format!(
                "delete {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Best-effort removal of a partially written file.
async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial upload"),
    }
}

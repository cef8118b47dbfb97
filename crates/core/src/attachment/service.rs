//! Attachment service implementation.

use std::sync::Arc;

use agora_shared::{AttachmentId, PostId};
use chrono::Utc;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::error::AttachmentError;
use super::extension::{FILE_FIELD, FILE_REQUIRED, PROHIBITED_FILE_TYPE, allowed_extension};
use super::types::{
    CreateAttachmentInput, FieldErrors, Post, PostAttachment, UploadOutcome, UploadedFile,
};
use crate::permission::{Actor, AuthorOrModerator, PostPermissions};
use crate::storage::BlobDirectory;

/// Repository trait for post and attachment persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait AttachmentRepository: Send + Sync {
    /// Find a post by ID.
    fn find_post(
        &self,
        post_id: PostId,
    ) -> impl std::future::Future<Output = Result<Option<Post>, AttachmentError>> + Send;

    /// Find an attachment together with its owning post.
    fn find_with_post(
        &self,
        id: AttachmentId,
    ) -> impl std::future::Future<Output = Result<Option<(PostAttachment, Post)>, AttachmentError>>
    + Send;

    /// List a post's attachments, newest first.
    fn list_by_post(
        &self,
        post_id: PostId,
    ) -> impl std::future::Future<Output = Result<Vec<PostAttachment>, AttachmentError>> + Send;

    /// Insert an attachment record.
    fn create(
        &self,
        input: CreateAttachmentInput,
    ) -> impl std::future::Future<Output = Result<PostAttachment, AttachmentError>> + Send;

    /// Delete an attachment record. Returns whether a row was removed.
    fn delete(
        &self,
        id: AttachmentId,
    ) -> impl std::future::Future<Output = Result<bool, AttachmentError>> + Send;
}

/// Attachment service pairing blob files with their metadata rows.
pub struct AttachmentService<R: AttachmentRepository, P: PostPermissions = AuthorOrModerator> {
    blobs: Arc<BlobDirectory>,
    repo: Arc<R>,
    permissions: Arc<P>,
}

impl<R: AttachmentRepository, P: PostPermissions> AttachmentService<R, P> {
    /// Create a new attachment service.
    #[must_use]
    pub fn new(blobs: Arc<BlobDirectory>, repo: Arc<R>, permissions: Arc<P>) -> Self {
        Self {
            blobs,
            repo,
            permissions,
        }
    }

    /// Resolve a post the actor may edit.
    ///
    /// # Errors
    ///
    /// Returns `PostNotFound` if the id is absent, the post does not exist, or
    /// the actor may not edit it.
    pub async fn editable_post(
        &self,
        actor: &Actor,
        post_id: Option<PostId>,
    ) -> Result<Post, AttachmentError> {
        let post_id = post_id.ok_or(AttachmentError::PostNotFound)?;
        let post = self
            .repo
            .find_post(post_id)
            .await?
            .ok_or(AttachmentError::PostNotFound)?;

        if !self.permissions.can_edit_post(actor, &post) {
            debug!(post_id = %post_id, user_id = %actor.user_id, "Post not editable by actor");
            return Err(AttachmentError::PostNotFound);
        }

        Ok(post)
    }

    /// List the attachments of a post the actor may edit.
    ///
    /// # Errors
    ///
    /// Returns `PostNotFound` under the rules of [`Self::editable_post`], or a
    /// repository error.
    pub async fn list(
        &self,
        actor: &Actor,
        post_id: Option<PostId>,
    ) -> Result<(Post, Vec<PostAttachment>), AttachmentError> {
        let post = self.editable_post(actor, post_id).await?;
        let attachments = self.repo.list_by_post(post.id).await?;
        Ok((post, attachments))
    }

    /// Upload a file to a post.
    ///
    /// Validation failures come back as [`UploadOutcome::Invalid`] with nothing
    /// written. Otherwise the file is created exclusively under a fresh id, then
    /// the row is inserted; if the insert fails the file is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The post is missing or not editable (`PostNotFound`)
    /// - A file already exists at the generated location (`Conflict`)
    /// - The body could not be read, or storage fails
    /// - The database insert fails
    pub async fn upload<B>(
        &self,
        actor: &Actor,
        post_id: Option<PostId>,
        file: Option<UploadedFile<B>>,
    ) -> Result<UploadOutcome, AttachmentError>
    where
        B: AsyncRead + Send,
    {
        let post = self.editable_post(actor, post_id).await?;

        let (body, extension) = match validate(file) {
            Ok(valid) => valid,
            Err(errors) => return Ok(UploadOutcome::Invalid { post, errors }),
        };

        let id = AttachmentId::new();
        let bytes = self.blobs.write_new(id, extension, body).await?;

        let input = CreateAttachmentInput {
            id,
            post_id: post.id,
            path: BlobDirectory::public_path(id, extension),
            created: Utc::now(),
        };

        match self.repo.create(input).await {
            Ok(attachment) => {
                info!(
                    post_id = %post.id,
                    attachment_id = %attachment.id,
                    bytes,
                    "Attachment uploaded"
                );
                Ok(UploadOutcome::Created(attachment))
            }
            Err(err) => {
                if let Err(cleanup) = self.blobs.remove(id, extension).await {
                    warn!(
                        attachment_id = %id,
                        error = %cleanup,
                        "Failed to remove file after insert failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Resolve an attachment for delete confirmation.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is absent, the attachment does not exist, or
    /// the actor may not edit its post.
    pub async fn deletable(
        &self,
        actor: &Actor,
        id: Option<AttachmentId>,
    ) -> Result<(PostAttachment, Post), AttachmentError> {
        let id = id.ok_or(AttachmentError::NotFound)?;
        let (attachment, post) = self
            .repo
            .find_with_post(id)
            .await?
            .ok_or(AttachmentError::NotFound)?;

        if !self.permissions.can_edit_post(actor, &post) {
            debug!(attachment_id = %id, user_id = %actor.user_id, "Post not editable by actor");
            return Err(AttachmentError::NotFound);
        }

        Ok((attachment, post))
    }

    /// Delete an attachment: the file first, then the row.
    ///
    /// A file that is already gone is not an error. Returns the owning post.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` under the rules of [`Self::deletable`], or a storage
    /// or repository error.
    pub async fn delete(
        &self,
        actor: &Actor,
        id: Option<AttachmentId>,
    ) -> Result<PostId, AttachmentError> {
        let (attachment, post) = self.deletable(actor, id).await?;

        let removed = self
            .blobs
            .remove(attachment.id, attachment.extension())
            .await?;
        if !removed {
            warn!(attachment_id = %attachment.id, "Attachment file was already missing");
        }

        self.repo.delete(attachment.id).await?;

        info!(post_id = %post.id, attachment_id = %attachment.id, "Attachment deleted");
        Ok(post.id)
    }
}

/// Check the upload against the form rules.
fn validate<B>(file: Option<UploadedFile<B>>) -> Result<(B, &'static str), FieldErrors> {
    let mut errors = FieldErrors::default();

    let Some(file) = file else {
        errors.add(FILE_FIELD, FILE_REQUIRED);
        return Err(errors);
    };

    let Some(extension) = allowed_extension(file.file_name.as_deref().unwrap_or_default()) else {
        errors.add(FILE_FIELD, PROHIBITED_FILE_TYPE);
        return Err(errors);
    };

    Ok((file.body, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_shared::{Role, UserId};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock repository for testing.
    #[derive(Default)]
    struct MockAttachmentRepository {
        posts: Mutex<HashMap<PostId, Post>>,
        attachments: Mutex<HashMap<AttachmentId, PostAttachment>>,
        fail_create: bool,
    }

    impl MockAttachmentRepository {
        fn failing_create() -> Self {
            Self {
                fail_create: true,
                ..Self::default()
            }
        }

        fn add_post(&self, author_id: UserId) -> PostId {
            let post = Post {
                id: PostId::new(),
                author_id,
                title: "Holiday photos".to_string(),
            };
            let id = post.id;
            self.posts.lock().unwrap().insert(id, post);
            id
        }

        fn attachment_count(&self) -> usize {
            self.attachments.lock().unwrap().len()
        }
    }

    impl AttachmentRepository for MockAttachmentRepository {
        async fn find_post(&self, post_id: PostId) -> Result<Option<Post>, AttachmentError> {
            Ok(self.posts.lock().unwrap().get(&post_id).cloned())
        }

        async fn find_with_post(
            &self,
            id: AttachmentId,
        ) -> Result<Option<(PostAttachment, Post)>, AttachmentError> {
            let attachment = self.attachments.lock().unwrap().get(&id).cloned();
            Ok(attachment.and_then(|a| {
                let post = self.posts.lock().unwrap().get(&a.post_id).cloned()?;
                Some((a, post))
            }))
        }

        async fn list_by_post(
            &self,
            post_id: PostId,
        ) -> Result<Vec<PostAttachment>, AttachmentError> {
            let mut items: Vec<_> = self
                .attachments
                .lock()
                .unwrap()
                .values()
                .filter(|a| a.post_id == post_id)
                .cloned()
                .collect();
            items.sort_by(|a, b| b.created.cmp(&a.created));
            Ok(items)
        }

        async fn create(
            &self,
            input: CreateAttachmentInput,
        ) -> Result<PostAttachment, AttachmentError> {
            if self.fail_create {
                return Err(AttachmentError::repository("insert failed"));
            }
            let attachment = PostAttachment {
                id: input.id,
                post_id: input.post_id,
                path: input.path,
                created: input.created,
            };
            self.attachments
                .lock()
                .unwrap()
                .insert(attachment.id, attachment.clone());
            Ok(attachment)
        }

        async fn delete(&self, id: AttachmentId) -> Result<bool, AttachmentError> {
            Ok(self.attachments.lock().unwrap().remove(&id).is_some())
        }
    }

    struct Fixture {
        _web_root: tempfile::TempDir,
        blobs: Arc<BlobDirectory>,
        repo: Arc<MockAttachmentRepository>,
        service: AttachmentService<MockAttachmentRepository>,
        author: Actor,
        post_id: PostId,
    }

    impl Fixture {
        async fn new() -> Self {
            Self::with_repo(MockAttachmentRepository::default()).await
        }

        async fn with_repo(repo: MockAttachmentRepository) -> Self {
            let web_root = tempfile::tempdir().expect("tempdir");
            let blobs = Arc::new(BlobDirectory::new(web_root.path()));
            blobs.ensure_exists().await.expect("mkdir");

            let author = Actor::new(UserId::new(), Role::Member);
            let post_id = repo.add_post(author.user_id);
            let repo = Arc::new(repo);
            let service =
                AttachmentService::new(blobs.clone(), repo.clone(), Arc::new(AuthorOrModerator));

            Self {
                _web_root: web_root,
                blobs,
                repo,
                service,
                author,
                post_id,
            }
        }

        fn file_count(&self) -> usize {
            std::fs::read_dir(self.blobs.root()).expect("read dir").count()
        }

        async fn upload(&self, actor: &Actor, name: &str, body: &'static [u8]) -> UploadOutcome {
            self.service
                .upload(
                    actor,
                    Some(self.post_id),
                    Some(UploadedFile::new(Some(name.to_string()), body)),
                )
                .await
                .expect("upload should pass permission check")
        }
    }

    fn created(outcome: UploadOutcome) -> PostAttachment {
        match outcome {
            UploadOutcome::Created(attachment) => attachment,
            UploadOutcome::Invalid { errors, .. } => panic!("unexpected field errors: {errors:?}"),
        }
    }

    fn file_errors(outcome: UploadOutcome) -> Vec<String> {
        match outcome {
            UploadOutcome::Invalid { errors, .. } => errors.get(FILE_FIELD).to_vec(),
            UploadOutcome::Created(a) => panic!("unexpected upload: {a:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_allowed_file_creates_row_and_file() {
        let fx = Fixture::new().await;

        let attachment = created(fx.upload(&fx.author, "photo.png", b"\x89PNG data").await);

        assert_eq!(attachment.post_id, fx.post_id);
        assert_eq!(
            attachment.path,
            format!("/attachments/{}.png", attachment.id.hex())
        );
        assert_eq!(fx.repo.attachment_count(), 1);
        assert_eq!(fx.file_count(), 1);

        // The stored path resolves to the uploaded bytes.
        let file_name = attachment
            .path
            .strip_prefix("/attachments/")
            .expect("public prefix");
        let stored = std::fs::read(fx.blobs.root().join(file_name)).expect("read");
        assert_eq!(stored, b"\x89PNG data");
    }

    #[tokio::test]
    async fn test_upload_prohibited_extension_has_no_side_effects() {
        let fx = Fixture::new().await;

        let errors = file_errors(fx.upload(&fx.author, "script.exe", b"MZ").await);

        assert_eq!(errors, [PROHIBITED_FILE_TYPE]);
        assert_eq!(fx.repo.attachment_count(), 0);
        assert_eq!(fx.file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_extension_is_case_sensitive() {
        let fx = Fixture::new().await;

        let errors = file_errors(fx.upload(&fx.author, "PHOTO.PNG", b"x").await);

        assert_eq!(errors, [PROHIBITED_FILE_TYPE]);
        assert_eq!(fx.file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_part() {
        let fx = Fixture::new().await;

        let outcome = fx
            .service
            .upload::<&[u8]>(&fx.author, Some(fx.post_id), None)
            .await
            .expect("upload");

        match outcome {
            UploadOutcome::Invalid { post, errors } => {
                assert_eq!(post.id, fx.post_id);
                assert_eq!(errors.get(FILE_FIELD), [FILE_REQUIRED]);
            }
            UploadOutcome::Created(_) => panic!("expected field errors"),
        }
    }

    #[tokio::test]
    async fn test_upload_ignores_client_directories() {
        let fx = Fixture::new().await;

        let attachment = created(fx.upload(&fx.author, "../../../etc/cron.d/x.gif", b"GIF").await);

        assert_eq!(
            attachment.path,
            BlobDirectory::public_path(attachment.id, ".gif")
        );
        assert!(fx.blobs.disk_path(attachment.id, ".gif").exists());
        assert_eq!(fx.file_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_to_missing_post_is_not_found() {
        let fx = Fixture::new().await;
        let file = UploadedFile::new(Some("photo.png".to_string()), &b"x"[..]);

        let result = fx
            .service
            .upload(&fx.author, Some(PostId::new()), Some(file))
            .await;

        assert!(matches!(result, Err(AttachmentError::PostNotFound)));
        assert_eq!(fx.file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_post_id_is_not_found() {
        let fx = Fixture::new().await;
        let file = UploadedFile::new(Some("photo.png".to_string()), &b"x"[..]);

        let result = fx.service.upload(&fx.author, None, Some(file)).await;

        assert!(matches!(result, Err(AttachmentError::PostNotFound)));
    }

    #[tokio::test]
    async fn test_upload_by_other_member_looks_like_missing_post() {
        let fx = Fixture::new().await;
        let stranger = Actor::new(UserId::new(), Role::Member);
        let file = UploadedFile::new(Some("photo.png".to_string()), &b"x"[..]);

        let result = fx
            .service
            .upload(&stranger, Some(fx.post_id), Some(file))
            .await;

        assert!(matches!(result, Err(AttachmentError::PostNotFound)));
        assert_eq!(fx.repo.attachment_count(), 0);
        assert_eq!(fx.file_count(), 0);
    }

    #[tokio::test]
    async fn test_moderator_can_upload_to_any_post() {
        let fx = Fixture::new().await;
        let moderator = Actor::new(UserId::new(), Role::Moderator);

        created(fx.upload(&moderator, "photo.jpg", b"jpg").await);

        assert_eq!(fx.repo.attachment_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_removes_written_file() {
        let fx = Fixture::with_repo(MockAttachmentRepository::failing_create()).await;
        let file = UploadedFile::new(Some("photo.png".to_string()), &b"x"[..]);

        let result = fx
            .service
            .upload(&fx.author, Some(fx.post_id), Some(file))
            .await;

        assert!(matches!(result, Err(AttachmentError::Repository(_))));
        assert_eq!(fx.file_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_row() {
        let fx = Fixture::new().await;
        let attachment = created(fx.upload(&fx.author, "photo.png", b"png").await);

        let post_id = fx
            .service
            .delete(&fx.author, Some(attachment.id))
            .await
            .expect("delete");

        assert_eq!(post_id, fx.post_id);
        assert_eq!(fx.repo.attachment_count(), 0);
        assert!(!fx.blobs.disk_path(attachment.id, ".png").exists());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let fx = Fixture::new().await;
        let attachment = created(fx.upload(&fx.author, "photo.gif", b"gif").await);
        std::fs::remove_file(fx.blobs.disk_path(attachment.id, ".gif")).expect("remove");

        fx.service
            .delete(&fx.author, Some(attachment.id))
            .await
            .expect("delete should succeed without a file");

        assert_eq!(fx.repo.attachment_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_other_member_changes_nothing() {
        let fx = Fixture::new().await;
        let attachment = created(fx.upload(&fx.author, "photo.png", b"png").await);
        let stranger = Actor::new(UserId::new(), Role::Member);

        let result = fx.service.delete(&stranger, Some(attachment.id)).await;

        assert!(matches!(result, Err(AttachmentError::NotFound)));
        assert_eq!(fx.repo.attachment_count(), 1);
        assert!(fx.blobs.disk_path(attachment.id, ".png").exists());
    }

    #[tokio::test]
    async fn test_delete_unknown_attachment() {
        let fx = Fixture::new().await;

        let missing = fx.service.delete(&fx.author, Some(AttachmentId::new())).await;
        let absent = fx.service.delete(&fx.author, None).await;

        assert!(matches!(missing, Err(AttachmentError::NotFound)));
        assert!(matches!(absent, Err(AttachmentError::NotFound)));
    }

    #[tokio::test]
    async fn test_deletable_returns_attachment_and_post() {
        let fx = Fixture::new().await;
        let attachment = created(fx.upload(&fx.author, "photo.jpeg", b"jpeg").await);

        let (found, post) = fx
            .service
            .deletable(&fx.author, Some(attachment.id))
            .await
            .expect("deletable");

        assert_eq!(found, attachment);
        assert_eq!(post.id, fx.post_id);
        assert!(fx.blobs.disk_path(attachment.id, ".jpeg").exists());
    }

    #[tokio::test]
    async fn test_list_returns_post_attachments() {
        let fx = Fixture::new().await;
        let first = created(fx.upload(&fx.author, "a.png", b"a").await);
        let second = created(fx.upload(&fx.author, "b.png", b"b").await);

        let other_post = fx.repo.add_post(fx.author.user_id);
        fx.service
            .upload(
                &fx.author,
                Some(other_post),
                Some(UploadedFile::new(Some("c.png".to_string()), &b"c"[..])),
            )
            .await
            .expect("upload");

        let (post, attachments) = fx
            .service
            .list(&fx.author, Some(fx.post_id))
            .await
            .expect("list");

        assert_eq!(post.id, fx.post_id);
        let ids: Vec<_> = attachments.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
        assert!(attachments[0].created >= attachments[1].created);
    }
}

//! Attachment repository for database operations.
//!
//! Implements post and attachment lookups and attachment writes using SeaORM.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

use crate::entities::{post_attachments, posts};
use agora_core::attachment::{
    AttachmentError, AttachmentRepository as AttachmentRepoTrait, CreateAttachmentInput, Post,
    PostAttachment,
};
use agora_shared::{AttachmentId, PostId, UserId};

/// Attachment repository implementation.
///
/// Shares the connection with its caller; `DatabaseConnection` is not `Clone`
/// once SeaORM's `mock` feature is enabled.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    db: Arc<DatabaseConnection>,
}

impl AttachmentRepository {
    /// Create a new attachment repository.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl AttachmentRepoTrait for AttachmentRepository {
    async fn find_post(&self, post_id: PostId) -> Result<Option<Post>, AttachmentError> {
        let model = posts::Entity::find_by_id(post_id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(model.map(post_to_domain))
    }

    async fn find_with_post(
        &self,
        id: AttachmentId,
    ) -> Result<Option<(PostAttachment, Post)>, AttachmentError> {
        let Some(attachment) = post_attachments::Entity::find_by_id(id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(repository_error)?
        else {
            return Ok(None);
        };

        let post = posts::Entity::find_by_id(attachment.post_id)
            .one(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(post.map(|post| (to_domain(attachment), post_to_domain(post))))
    }

    async fn list_by_post(&self, post_id: PostId) -> Result<Vec<PostAttachment>, AttachmentError> {
        let models = post_attachments::Entity::find()
            .filter(post_attachments::Column::PostId.eq(post_id.into_inner()))
            .order_by_desc(post_attachments::Column::Created)
            .all(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn create(&self, input: CreateAttachmentInput) -> Result<PostAttachment, AttachmentError> {
        let active_model = post_attachments::ActiveModel {
            id: Set(input.id.into_inner()),
            post_id: Set(input.post_id.into_inner()),
            path: Set(input.path),
            created: Set(input.created.into()),
        };

        let model = active_model.insert(self.db.as_ref()).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(detail)) = e.sql_err() {
                AttachmentError::Conflict(detail)
            } else {
                repository_error(e)
            }
        })?;

        Ok(to_domain(model))
    }

    async fn delete(&self, id: AttachmentId) -> Result<bool, AttachmentError> {
        let result = post_attachments::Entity::delete_by_id(id.into_inner())
            .exec(self.db.as_ref())
            .await
            .map_err(repository_error)?;

        Ok(result.rows_affected > 0)
    }
}

fn repository_error(e: DbErr) -> AttachmentError {
    AttachmentError::repository(e.to_string())
}

/// Convert database post model to domain post.
fn post_to_domain(model: posts::Model) -> Post {
    Post {
        id: PostId::from_uuid(model.id),
        author_id: UserId::from_uuid(model.author_id),
        title: model.title,
    }
}

/// Convert database model to domain attachment.
fn to_domain(model: post_attachments::Model) -> PostAttachment {
    PostAttachment {
        id: AttachmentId::from_uuid(model.id),
        post_id: PostId::from_uuid(model.post_id),
        path: model.path,
        created: model.created.with_timezone(&Utc),
    }
}

//! Posts and post attachments.
//!
//! `posts` carries only the columns the attachment feature reads; the forum
//! owns the rest of the post lifecycle.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(POSTS_ATTACHMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS post_attachments CASCADE; DROP TABLE IF EXISTS posts CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const POSTS_ATTACHMENTS_SQL: &str = r"
CREATE TABLE posts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    author_id UUID NOT NULL,
    title VARCHAR(300) NOT NULL,
    created TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_posts_author ON posts(author_id);

-- Attachment files live at <web_root>/attachments/<id-hex><ext>
CREATE TABLE post_attachments (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    path VARCHAR(255) NOT NULL,
    created TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_post_attachments_path UNIQUE (path)
);

-- Listing is per post, newest first
CREATE INDEX idx_post_attachments_post ON post_attachments(post_id, created DESC);
";

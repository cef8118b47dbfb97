//! `SeaORM` entity definitions.

pub mod post_attachments;
pub mod posts;

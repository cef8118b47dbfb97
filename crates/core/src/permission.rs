//! Post edit authorization.

use agora_shared::{Role, UserId};

use crate::attachment::Post;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Authenticated user.
    pub user_id: UserId,
    /// Forum role of the user.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Answers "can this actor edit this post?".
pub trait PostPermissions: Send + Sync {
    /// Whether `actor` may edit `post` (and therefore manage its attachments).
    fn can_edit_post(&self, actor: &Actor, post: &Post) -> bool;
}

/// Authors edit their own posts; moderators and admins edit any post.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorOrModerator;

impl PostPermissions for AuthorOrModerator {
    fn can_edit_post(&self, actor: &Actor, post: &Post) -> bool {
        match actor.role {
            Role::Moderator | Role::Admin => true,
            Role::Member => post.author_id == actor.user_id,
        }
    }
}

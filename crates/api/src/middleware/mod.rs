//! Request middleware.

pub mod auth;
pub mod csrf;

pub use auth::AuthUser;

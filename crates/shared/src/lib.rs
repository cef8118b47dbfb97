//! Shared types, errors, and configuration for Agora.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management
//! - Access token claims and validation

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Role};
pub use config::{AppConfig, AttachmentsConfig, DatabaseConfig, JwtSettings, ServerConfig};
pub use error::AppError;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use types::{AttachmentId, PostId, UserId};

//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Post attachment routes
//! - Authentication and anti-forgery middleware
//! - Static serving of the web root, attachment files included

pub mod error;
pub mod middleware;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use agora_core::permission::AuthorOrModerator;
use agora_core::storage::BlobDirectory;
use agora_shared::{AttachmentsConfig, JwtService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Attachment file directory.
    pub blobs: Arc<BlobDirectory>,
    /// Post edit policy.
    pub permissions: Arc<AuthorOrModerator>,
    /// Static web root served for unmatched paths.
    pub web_root: PathBuf,
    /// Request body cap for uploads.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build the state from its collaborators and the attachment settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, jwt_service: JwtService, config: &AttachmentsConfig) -> Self {
        Self {
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
            blobs: Arc::new(BlobDirectory::new(&config.web_root)),
            permissions: Arc::new(AuthorOrModerator),
            web_root: config.web_root.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.web_root);

    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Agora API Server
//!
//! Main entry point for the post attachment service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora_api::{AppState, create_router};
use agora_db::connect;
use agora_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
    });

    let state = AppState::new(db, jwt_service, &config.attachments);
    state
        .blobs
        .ensure_exists()
        .await
        .context("Failed to create attachment directory")?;
    info!(
        web_root = %config.attachments.web_root.display(),
        blob_dir = %state.blobs.root().display(),
        max_upload_bytes = config.attachments.max_upload_bytes,
        "Attachment storage ready"
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! bakeflow - Messenger ordering assistant for a small bakery
//!
//! Each customer's chat is driven by a pure dialog state machine; the
//! runtime executes its effects against `SQLite` and the Messenger Send API.

mod api;
mod catalog;
mod config;
mod db;
mod finalizer;
mod intent;
mod messenger;
mod pricing;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use messenger::GraphApiGateway;
use runtime::{DatabaseOrderStore, InMemoryConversationStore, RuntimeManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bakeflow=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    // Messenger gateway
    if config.verify_token.is_none() {
        tracing::warn!("VERIFY_TOKEN not set; webhook verification will be refused");
    }
    if config.page_access_token.is_none() {
        tracing::warn!("PAGE_ACCESS_TOKEN not set; replies will not be delivered");
    }
    let gateway = GraphApiGateway::new(&config.graph_api_base, config.page_access_token.clone())?;
    if config.page_access_token.is_some() {
        if let Err(e) = gateway.setup_profile().await {
            tracing::warn!(error = %e, "Failed to configure Messenger profile");
        }
    }

    if config.hours.always_open {
        tracing::info!("Business hours disabled; ordering always allowed");
    } else {
        tracing::info!(
            open = config.hours.open_hour,
            close = config.hours.close_hour,
            "Business hours enforced"
        );
    }

    // Create application state
    let runtime = RuntimeManager::new(
        Arc::new(config.storefront()),
        Arc::new(DatabaseOrderStore::new(db)),
        Arc::new(gateway),
        Arc::new(InMemoryConversationStore::new()),
    );
    let state = AppState::new(Arc::new(runtime), config.verify_token.clone());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("bakeflow server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

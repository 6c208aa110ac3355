/// Server setup and initialization
///
/// Wires together the catalog registry, document storage, session registry
/// (with its idle sweeper) and HTTP routes. Provides the application factory
/// used by `main` and by tests.

use crate::{
    api::{create_api_routes, AppState, SessionRegistry},
    catalog::{CatalogRegistry, NodeCatalog},
    config::Config,
    storage::WorkflowStorage,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Create the main Axum application with all routes
///
/// Opens the document database and loads the toolbox catalog (built-in unless
/// a catalog file is configured).
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📋 Initializing workflow storage in {}", config.storage.data_dir);
    let storage = WorkflowStorage::connect(&config.storage.data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open workflow storage: {}", e))?;

    let catalog = match &config.catalog.path {
        Some(path) => NodeCatalog::load(path)?,
        None => {
            tracing::info!("🧰 Using built-in node catalog");
            NodeCatalog::builtin()
        }
    };

    let sessions = SessionRegistry::with_idle_timeout(config.sessions.idle_timeout());
    let state = AppState::new(CatalogRegistry::new(catalog), storage).with_sessions(sessions);

    tracing::info!(
        "🧹 Closing editing sessions idle for more than {}s",
        config.sessions.idle_timeout_secs
    );
    Arc::clone(&state.sessions).spawn_sweeper(config.sessions.sweep_period());

    let app = build_router(state);

    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Router over an already assembled state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_api_routes().with_state(state))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting workflow designer server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}

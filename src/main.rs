// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::admin_service::AdminService;
use crate::application::live_service::LiveMeasurementsService;
use crate::application::map_service::StationMapService;
use crate::application::measurement_feed::FeedHub;
use crate::application::observatory_repository::ObservatoryRepository;
use crate::application::session_service::SessionStore;
use crate::infrastructure::api_client::ApiClient;
use crate::infrastructure::config::{AssetUrls, load_config};
use crate::infrastructure::observatory_client::ObservatoryClient;
use crate::infrastructure::push_feed::SocketMeasurementFeed;
use crate::presentation::app_state::AppState;
use crate::presentation::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_config()?;
    let backend = &config.backend;
    let timeout = Duration::from_secs(backend.timeout_secs);

    // Create repository (infrastructure layer)
    let api = ApiClient::new(&backend.base_url, timeout).context("failed to build backend client")?;
    let repository: Arc<dyn ObservatoryRepository> =
        Arc::new(ObservatoryClient::new(api, backend.display_offset()?));
    let assets = AssetUrls::new(&backend.base_url);

    let feed = SocketMeasurementFeed::spawn(
        FeedHub::default(),
        backend.push_url(),
        timeout,
        Duration::from_secs(backend.reconnect_secs),
    );

    // Create services (application layer)
    let live = Arc::new(LiveMeasurementsService::new(
        repository.clone(),
        assets.clone(),
        backend.service_token.clone(),
    ));
    live.watch_feed(&feed);
    if let Err(e) = live.refresh().await {
        tracing::warn!("Initial readings unavailable: {}", e);
    }

    // Create application state
    let state = Arc::new(AppState {
        sessions: SessionStore::new(repository.clone(), backend.service_token.clone()),
        admin: AdminService::new(repository.clone(), assets.clone()),
        maps: StationMapService::new(repository, assets),
        live: live.clone(),
        service_token: backend.service_token.clone(),
    });

    let sweeper = state.sessions.start_sweeper(
        Duration::from_secs(config.server.viewer_sweep_secs.max(1)),
        Duration::from_secs(config.server.viewer_idle_secs),
    );

    // Build router (presentation layer)
    let app = router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!(
        "Starting observatorio dashboard on {} (backend {})",
        addr,
        backend.base_url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    live.shutdown();
    drop(feed);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

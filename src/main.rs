// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip Planner API Server
//!
//! Serves the itinerary UI's local API and, when configured, keeps the trip
//! in sync with a shared Firestore document.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_planner::{
    config::Config,
    db::{FileBlobStore, FirestoreConnector},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Trip Planner API");

    // Local persistence
    let blobs = Arc::new(FileBlobStore::open(&config.data_dir)?);
    tracing::info!(path = %config.data_dir.display(), "Local store opened");

    // Remote sync connects lazily, only once a session starts
    let connector = Arc::new(FirestoreConnector::new(&config.firestore_collection));

    let state = Arc::new(AppState::new(config.clone(), blobs, connector));

    let settings = state.store.load_sync_settings();
    if settings.is_startable() {
        let started = state.sync.start(&settings).await;
        tracing::info!(started, share_code = %settings.share_code, "Resumed sync");
    }

    // Build router
    let app = trip_planner::routes::create_router(state.clone());

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sync.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trip_planner=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote sync settings and status.

use crate::error::Result;
use crate::models::SyncSettings;
use crate::services::SyncStatus;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/sync", get(get_sync).put(put_sync))
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub settings: SyncSettings,
    pub status: SyncStatus,
}

async fn get_sync(State(state): State<Arc<AppState>>) -> Json<SyncResponse> {
    Json(SyncResponse {
        settings: state.store.load_sync_settings(),
        status: state.sync.status(),
    })
}

/// Save sync settings and restart the engine to match them.
///
/// Failure to start is not an error here; it shows up in the status.
async fn put_sync(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<SyncSettings>,
) -> Result<Json<SyncResponse>> {
    state.store.save_sync_settings(&settings)?;
    let settings = state.store.load_sync_settings();

    state.sync.stop().await;
    if settings.is_startable() {
        let started = state.sync.start(&settings).await;
        tracing::info!(started, share_code = %settings.share_code, "Sync settings applied");
    } else {
        tracing::info!("Sync disabled");
    }

    Ok(Json(SyncResponse {
        settings,
        status: state.sync.status(),
    }))
}

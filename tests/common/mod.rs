// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use std::sync::Arc;
use trip_planner::config::Config;
use trip_planner::db::{MemoryBlobStore, MemoryRemote};
use trip_planner::models::{NewActivity, SyncSettings};
use trip_planner::routes::create_router;
use trip_planner::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test app backed by in-memory storage and an in-memory remote.
/// Returns the router, the shared state and the remote.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryRemote) {
    let remote = MemoryRemote::new();
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(remote.clone()),
    ));
    (create_router(state.clone()), state, remote)
}

/// Sync settings that the in-memory remote accepts.
#[allow(dead_code)]
pub fn sync_settings(share_code: &str) -> SyncSettings {
    SyncSettings {
        config: r#"{"projectId":"test-project","apiKey":"test-key"}"#.to_string(),
        share_code: share_code.to_string(),
        enabled: true,
    }
}

#[allow(dead_code)]
pub fn new_activity(title: &str, date: &str, time: Option<&str>) -> NewActivity {
    NewActivity {
        date: date.to_string(),
        time: time.map(String::from),
        title: title.to_string(),
        ..Default::default()
    }
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

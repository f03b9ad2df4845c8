// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary API routes.

use crate::error::Result;
use crate::models::{Activity, ActivityPatch, Coordinates, NewActivity, Pin, SavedPlace};
use crate::services::location::{extract_coordinates, to_display_url};
use crate::services::time_model::render_range;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities).post(create_activity))
        .route(
            "/api/activities/{id}",
            patch(update_activity).delete(delete_activity),
        )
        .route("/api/overlaps", get(get_overlaps))
        .route("/api/pins", get(get_pins))
        .route("/api/location", get(resolve_location))
        .route("/api/saved-places", get(list_saved_places).delete(clear_saved_places))
        .route("/api/saved-places/import", post(import_saved_places))
        .route("/api/maps-key", get(get_maps_key).put(put_maps_key))
        .route("/api/reset", post(reset))
}

// ─── Activities ──────────────────────────────────────────────

/// Activity as shown in the day-grouped list.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub activity: Activity,
    /// "HH:MM", "HH:MM–HH:MM" or empty
    pub range: String,
    pub overlaps: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityView>,
    pub total: u32,
}

/// All activities in (date, time) order, with overlap flags.
async fn list_activities(State(state): State<Arc<AppState>>) -> Result<Json<ActivitiesResponse>> {
    let activities = state.itinerary.list_sorted()?;
    let overlaps = state.itinerary.overlaps()?;

    let views: Vec<ActivityView> = activities
        .into_iter()
        .map(|activity| ActivityView {
            range: render_range(&activity),
            overlaps: overlaps.contains(&activity.id),
            activity,
        })
        .collect();

    Ok(Json(ActivitiesResponse {
        total: views.len() as u32,
        activities: views,
    }))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewActivity>,
) -> Result<(StatusCode, Json<Activity>)> {
    let activity = state.itinerary.add(new)?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ActivityPatch>,
) -> Result<Json<Activity>> {
    Ok(Json(state.itinerary.update(&id, patch)?))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.itinerary.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct OverlapsResponse {
    pub ids: Vec<String>,
}

async fn get_overlaps(State(state): State<Arc<AppState>>) -> Result<Json<OverlapsResponse>> {
    let mut ids: Vec<String> = state.itinerary.overlaps()?.into_iter().collect();
    ids.sort();
    Ok(Json(OverlapsResponse { ids }))
}

// ─── Map ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PinsQuery {
    #[serde(default = "default_true")]
    activities: bool,
    #[serde(default = "default_true")]
    saved: bool,
}

fn default_true() -> bool {
    true
}

async fn get_pins(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PinsQuery>,
) -> Result<Json<Vec<Pin>>> {
    Ok(Json(state.itinerary.pins(params.activities, params.saved)?))
}

#[derive(Deserialize)]
struct LocationQuery {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Debug, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationResponse {
    pub display_url: String,
    pub coordinates: Option<Coordinates>,
}

/// Resolve a location field into a link and, when possible, coordinates.
async fn resolve_location(Query(params): Query<LocationQuery>) -> Json<LocationResponse> {
    Json(LocationResponse {
        display_url: to_display_url(&params.text),
        coordinates: extract_coordinates(params.text.trim()),
    })
}

// ─── Saved Places ────────────────────────────────────────────

async fn list_saved_places(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SavedPlace>>> {
    Ok(Json(state.itinerary.saved_places()?))
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// Replace saved places with the Point features of a GeoJSON export.
async fn import_saved_places(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ImportResponse>> {
    let imported = state.itinerary.import_saved_places(&body)?;
    Ok(Json(ImportResponse { imported }))
}

async fn clear_saved_places(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.itinerary.clear_saved_places()?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Settings ────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsKey {
    #[serde(default)]
    pub api_key: String,
}

async fn get_maps_key(State(state): State<Arc<AppState>>) -> Json<MapsKey> {
    Json(MapsKey {
        api_key: state.store.maps_api_key(),
    })
}

async fn put_maps_key(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MapsKey>,
) -> Result<Json<MapsKey>> {
    state.store.set_maps_api_key(&body.api_key)?;
    Ok(Json(MapsKey {
        api_key: state.store.maps_api_key(),
    }))
}

/// Remove all activities and saved places.
async fn reset(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    tracing::warn!("Resetting itinerary");
    state.itinerary.reset()?;
    Ok(StatusCode::NO_CONTENT)
}

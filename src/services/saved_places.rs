// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved-place import from GeoJSON exports (e.g. Google Takeout "Saved Places").

use crate::models::SavedPlace;
use geojson::GeoJson;
use std::fs;
use std::path::Path;

/// Load saved places from a GeoJSON file.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<SavedPlace>, ImportError> {
    let json_data =
        fs::read_to_string(path.as_ref()).map_err(|e| ImportError::IoError(e.to_string()))?;
    parse_saved_places(&json_data)
}

/// Parse a GeoJSON feature collection into saved places.
///
/// Only `Point` features with at least two finite coordinates are kept;
/// everything else is dropped silently. A document that is not a feature
/// collection is an error.
pub fn parse_saved_places(json_data: &str) -> Result<Vec<SavedPlace>, ImportError> {
    let geojson: GeoJson = json_data
        .parse()
        .map_err(|e: geojson::Error| ImportError::ParseError(e.to_string()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(ImportError::NotFeatureCollection);
    };

    let total = collection.features.len();
    let places: Vec<SavedPlace> = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let geometry = feature.geometry?;
            let geojson::Value::Point(position) = geometry.value else {
                return None;
            };
            if position.len() < 2 || !position.iter().all(|c| c.is_finite()) {
                return None;
            }
            Some(SavedPlace::new(
                position[0],
                position[1],
                feature.properties.unwrap_or_default(),
            ))
        })
        .collect();

    tracing::info!(
        imported = places.len(),
        dropped = total - places.len(),
        "Parsed saved places"
    );
    Ok(places)
}

/// Errors from saved-place import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Imported point of interest, stored as a GeoJSON point feature.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A saved place: a point geometry plus a free-form properties bag.
///
/// Serializes as `{"type":"Feature","geometry":{"type":"Point",...},"properties":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct SavedPlace {
    pub geometry: PointGeometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// GeoJSON point geometry (`[lng, lat, ...]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct PointGeometry {
    pub coordinates: Vec<f64>,
}

impl SavedPlace {
    pub fn new(lng: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self {
            geometry: PointGeometry {
                coordinates: vec![lng, lat],
            },
            properties,
        }
    }

    pub fn lng(&self) -> Option<f64> {
        self.geometry.coordinates.first().copied()
    }

    pub fn lat(&self) -> Option<f64> {
        self.geometry.coordinates.get(1).copied()
    }

    /// Display name, from the first name-like property present.
    ///
    /// Covers plain GeoJSON (`name`, `title`) and Google Takeout exports
    /// (`Title`, `location.name`, `Location.Business Name`).
    pub fn title(&self) -> Option<&str> {
        self.str_property(&["name", "title", "Title"])
            .or_else(|| self.nested_str_property(&["location", "Location"], &["name", "Business Name"]))
    }

    pub fn address(&self) -> Option<&str> {
        self.str_property(&["address", "Address"])
            .or_else(|| self.nested_str_property(&["location", "Location"], &["address", "Address"]))
    }

    pub fn url(&self) -> Option<&str> {
        self.str_property(&["url", "google_maps_url", "Google Maps URL"])
    }

    fn str_property(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.properties.get(*k))
            .filter_map(Value::as_str)
            .find(|v| !v.trim().is_empty())
    }

    fn nested_str_property(&self, parents: &[&str], keys: &[&str]) -> Option<&str> {
        parents
            .iter()
            .filter_map(|p| self.properties.get(*p))
            .filter_map(Value::as_object)
            .flat_map(|obj| keys.iter().filter_map(move |k| obj.get(*k)))
            .filter_map(Value::as_str)
            .find(|v| !v.trim().is_empty())
    }
}

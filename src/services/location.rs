// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location field normalization: display URLs and coordinate extraction.

use crate::models::Coordinates;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Map search endpoint used for plain-text locations.
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Query parameters that may carry "lat,lng", in priority order.
const COORDINATE_PARAMS: [&str; 3] = ["q", "query", "ll"];

/// Google Maps place data marker: `!3d<lat>!4d<lng>`.
static DATA_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)").expect("valid data marker regex")
});

/// Turn a location field into something a browser can open.
///
/// Absolute http(s) URLs are returned trimmed; anything else becomes a map
/// search for the text.
pub fn to_display_url(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return text.to_string();
    }
    if is_http_url(trimmed) {
        return trimmed.to_string();
    }
    format!("{}{}", MAPS_SEARCH_URL, urlencoding::encode(trimmed))
}

fn is_http_url(text: &str) -> bool {
    Url::parse(text)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

/// Extract coordinates from a map URL.
///
/// Heuristics, first hit wins:
/// 1. the last `!3d..!4d..` data marker,
/// 2. the first of the `q`, `query`, `ll` query parameters that parses,
/// 3. the `lat,lng` segment after the last `@`.
///
/// A heuristic whose numbers do not parse falls through to the next one.
/// `None` means the location is display-only.
pub fn extract_coordinates(url: &str) -> Option<Coordinates> {
    from_data_marker(url)
        .or_else(|| from_query_params(url))
        .or_else(|| from_at_segment(url))
}

fn from_data_marker(url: &str) -> Option<Coordinates> {
    // Later markers describe the selected place more precisely.
    let caps = DATA_MARKER.captures_iter(url).last()?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lng = caps.get(2)?.as_str().parse().ok()?;
    Coordinates::new(lat, lng)
}

fn from_query_params(url: &str) -> Option<Coordinates> {
    let parsed = Url::parse(url.trim()).ok()?;
    COORDINATE_PARAMS.iter().find_map(|name| {
        parsed
            .query_pairs()
            .find(|(k, _)| **k == **name)
            .and_then(|(_, v)| parse_pair(&v))
    })
}

fn from_at_segment(url: &str) -> Option<Coordinates> {
    let (_, rest) = url.rsplit_once('@')?;
    let segment = rest.split(['/', '?', '#']).next()?;
    parse_pair(segment)
}

/// Parse the first two comma-separated numbers as latitude and longitude.
fn parse_pair(text: &str) -> Option<Coordinates> {
    let mut parts = text.split(',');
    let lat = parts.next()?.trim().parse().ok()?;
    let lng = parts.next()?.trim().parse().ok()?;
    Coordinates::new(lat, lng)
}

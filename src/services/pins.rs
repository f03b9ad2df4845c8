// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merge activity and saved-place points into one deduplicated pin list.

use crate::models::{Activity, Coordinates, Pin, PinKind, SavedPlace};
use crate::services::location::{extract_coordinates, to_display_url};
use std::collections::HashMap;

/// Rounding precision for the dedup key (5 decimals, about 1.1 m).
const KEY_SCALE: f64 = 100_000.0;

const SAVED_PLACE_FALLBACK_TITLE: &str = "Saved place";

/// Coordinates rounded to the dedup precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PinKey(i64, i64);

impl PinKey {
    fn new(lat: f64, lng: f64) -> Self {
        Self((lat * KEY_SCALE).round() as i64, (lng * KEY_SCALE).round() as i64)
    }
}

/// Insertion-ordered map from rounded coordinates to pins.
///
/// Re-inserting an existing key replaces the pin but keeps its position.
#[derive(Default)]
struct PinMap {
    pins: Vec<Pin>,
    index: HashMap<PinKey, usize>,
}

impl PinMap {
    fn insert(&mut self, pin: Pin) {
        let key = PinKey::new(pin.lat, pin.lng);
        match self.index.get(&key) {
            Some(&i) => self.pins[i] = pin,
            None => {
                self.index.insert(key, self.pins.len());
                self.pins.push(pin);
            }
        }
    }
}

/// Build the map pins for the current itinerary.
///
/// Saved places are inserted first and activities second, so an activity
/// pin replaces a saved pin at the same rounded coordinate. Activities
/// whose location yields no coordinates are left off the map.
pub fn merge_pins(
    activities: &[Activity],
    saved_places: &[SavedPlace],
    show_activities: bool,
    show_saved: bool,
) -> Vec<Pin> {
    let mut map = PinMap::default();

    if show_saved {
        saved_places
            .iter()
            .filter_map(saved_pin)
            .for_each(|pin| map.insert(pin));
    }

    if show_activities {
        activities
            .iter()
            .filter_map(activity_pin)
            .for_each(|pin| map.insert(pin));
    }

    map.pins
}

fn saved_pin(place: &SavedPlace) -> Option<Pin> {
    let coords = Coordinates::new(place.lat()?, place.lng()?)?;
    Some(Pin {
        kind: PinKind::Saved,
        title: place
            .title()
            .unwrap_or(SAVED_PLACE_FALLBACK_TITLE)
            .to_string(),
        activity_id: None,
        url: place.url().map(String::from),
        address: place.address().map(String::from),
        lat: coords.lat,
        lng: coords.lng,
    })
}

fn activity_pin(activity: &Activity) -> Option<Pin> {
    let location = activity.location.as_deref()?;
    let coords = extract_coordinates(location)?;
    Some(Pin {
        kind: PinKind::Activity,
        title: activity.title.clone(),
        activity_id: Some(activity.id.clone()),
        url: Some(to_display_url(location)),
        address: activity.city.clone(),
        lat: coords.lat,
        lng: coords.lng,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use serde_json::{json, Map};

    fn activity(id: &str, location: Option<&str>) -> Activity {
        Activity {
            id: id.to_string(),
            date: "2024-05-01".to_string(),
            time: None,
            duration_minutes: None,
            title: format!("Activity {}", id),
            city: None,
            location: location.map(String::from),
            comments: None,
            link: None,
            kind: ActivityType::Activity,
        }
    }

    fn saved(lat: f64, lng: f64, name: &str) -> SavedPlace {
        let props = json!({ "name": name });
        SavedPlace::new(lng, lat, props.as_object().cloned().unwrap_or_else(Map::new))
    }

    #[test]
    fn test_activity_pin_replaces_saved_pin_at_same_key() {
        let activities = vec![activity("a", Some("https://maps.google.com/?q=48.858400,2.294500"))];
        let places = vec![saved(48.858401, 2.294502, "Eiffel Tower")];

        let pins = merge_pins(&activities, &places, true, true);

        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].kind, PinKind::Activity);
        assert_eq!(pins[0].activity_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_distinct_keys_are_kept_in_insertion_order() {
        let activities = vec![
            activity("a", Some("https://www.google.com/maps/@40.4168,-3.7038,15z")),
            activity("b", Some("Plaza Mayor")),
        ];
        let places = vec![saved(48.8584, 2.2945, "Eiffel Tower"), saved(51.5007, -0.1246, "Big Ben")];

        let pins = merge_pins(&activities, &places, true, true);
        let titles: Vec<&str> = pins.iter().map(|p| p.title.as_str()).collect();

        assert_eq!(titles, vec!["Eiffel Tower", "Big Ben", "Activity a"]);
    }

    #[test]
    fn test_visibility_flags() {
        let activities = vec![activity("a", Some("https://maps.google.com/?q=1.0,1.0"))];
        let places = vec![saved(2.0, 2.0, "P")];

        assert_eq!(merge_pins(&activities, &places, false, true).len(), 1);
        assert_eq!(merge_pins(&activities, &places, true, false)[0].kind, PinKind::Activity);
        assert!(merge_pins(&activities, &places, false, false).is_empty());
    }

    #[test]
    fn test_saved_place_without_name_gets_fallback_title() {
        let place = SavedPlace::new(2.0, 1.0, Map::new());
        let pins = merge_pins(&[], &[place], true, true);
        assert_eq!(pins[0].title, SAVED_PLACE_FALLBACK_TITLE);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - itinerary logic and remote sync.

pub mod itinerary;
pub mod location;
pub mod overlap;
pub mod pins;
pub mod saved_places;
pub mod sync;
pub mod time_model;

pub use itinerary::ItineraryService;
pub use overlap::find_overlaps;
pub use pins::merge_pins;
pub use saved_places::ImportError;
pub use sync::{ChangeListener, LocalChange, SyncEngine, SyncHost, SyncState, SyncStatus};

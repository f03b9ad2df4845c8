// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod pin;
pub mod saved_place;
pub mod sync;

pub use activity::{Activity, ActivityPatch, ActivityType, NewActivity};
pub use pin::{Coordinates, Pin, PinKind};
pub use saved_place::SavedPlace;
pub use sync::{RemoteSnapshot, SyncCredentials, SyncSettings, SCHEMA_VERSION};

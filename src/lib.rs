// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Trip planner: a day-by-day itinerary with map pins and shared sync.
//!
//! This crate provides the local API behind the itinerary UI: activity
//! storage and ordering, overlap detection, map pin merging, and an optional
//! live sync of the whole trip against a shared Firestore document.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::{BlobStore, RemoteConnector, Store};
use services::{ChangeListener, ItineraryService, SyncEngine, SyncHost};
use std::sync::{Arc, Weak};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub itinerary: Arc<ItineraryService>,
    pub sync: Arc<SyncEngine>,
}

impl AppState {
    /// Load the itinerary and wire local changes into the sync engine.
    pub fn new(
        config: Config,
        blobs: Arc<dyn BlobStore>,
        connector: Arc<dyn RemoteConnector>,
    ) -> Self {
        let store = Store::new(blobs);
        let itinerary = Arc::new(ItineraryService::load(store.clone()));

        let host: Arc<dyn SyncHost> = itinerary.clone();
        let sync = Arc::new(SyncEngine::new(connector, host, config.sync_debounce));

        // Weak so the engine and the itinerary do not keep each other alive.
        let engine: Weak<SyncEngine> = Arc::downgrade(&sync);
        let listener: Weak<dyn ChangeListener> = engine;
        itinerary.set_change_listener(listener);

        Self {
            config,
            store,
            itinerary,
            sync,
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary state: the in-memory activity set and saved places.
//!
//! Every local mutation is persisted first and then announced to the change
//! listener (the sync engine). Remote snapshots are persisted but not
//! announced, so applying one never echoes a push.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityPatch, NewActivity, Pin, RemoteSnapshot, SavedPlace};
use crate::services::overlap::find_overlaps;
use crate::services::pins::merge_pins;
use crate::services::saved_places::parse_saved_places;
use crate::services::sync::{ChangeListener, LocalChange, SyncHost};
use crate::services::time_model::sort_activities;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use validator::Validate;

/// Owner of the itinerary state.
pub struct ItineraryService {
    store: Store,
    activities: RwLock<Vec<Activity>>,
    saved_places: RwLock<Vec<SavedPlace>>,
    listener: RwLock<Option<Weak<dyn ChangeListener>>>,
}

impl ItineraryService {
    /// Load the persisted state.
    pub fn load(store: Store) -> Self {
        let activities = store.load_activities();
        let saved_places = store.load_saved_places();
        tracing::info!(
            activities = activities.len(),
            saved_places = saved_places.len(),
            "Loaded itinerary"
        );
        Self {
            store,
            activities: RwLock::new(activities),
            saved_places: RwLock::new(saved_places),
            listener: RwLock::new(None),
        }
    }

    /// Register the receiver of local change notifications.
    pub fn set_change_listener(&self, listener: Weak<dyn ChangeListener>) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = Some(listener);
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn notify(&self, change: LocalChange) {
        let listener = self
            .listener
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(Weak::upgrade));
        if let Some(listener) = listener {
            listener.on_local_change(change);
        }
    }

    fn read_activities(&self) -> Result<RwLockReadGuard<'_, Vec<Activity>>> {
        self.activities
            .read()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("activity lock poisoned")))
    }

    fn write_activities(&self) -> Result<RwLockWriteGuard<'_, Vec<Activity>>> {
        self.activities
            .write()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("activity lock poisoned")))
    }

    fn read_saved_places(&self) -> Result<RwLockReadGuard<'_, Vec<SavedPlace>>> {
        self.saved_places
            .read()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("saved place lock poisoned")))
    }

    fn write_saved_places(&self) -> Result<RwLockWriteGuard<'_, Vec<SavedPlace>>> {
        self.saved_places
            .write()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("saved place lock poisoned")))
    }

    // ─── Activities ──────────────────────────────────────────────

    /// Activities in canonical (date, time) order.
    pub fn list_sorted(&self) -> Result<Vec<Activity>> {
        let mut list = self.read_activities()?.clone();
        sort_activities(&mut list);
        Ok(list)
    }

    pub fn get(&self, id: &str) -> Result<Activity> {
        self.read_activities()?
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))
    }

    /// Validate and add a new activity with a fresh id.
    pub fn add(&self, new: NewActivity) -> Result<Activity> {
        new.validate()?;
        let activity = new.into_activity();

        {
            let mut activities = self.write_activities()?;
            let mut next = activities.clone();
            next.push(activity.clone());
            self.store.save_activities(&next)?;
            *activities = next;
        }

        tracing::info!(id = %activity.id, date = %activity.date, "Added activity");
        self.notify(LocalChange::ActivitiesChanged);
        Ok(activity)
    }

    /// Apply a partial update to the activity with the given id.
    pub fn update(&self, id: &str, patch: ActivityPatch) -> Result<Activity> {
        patch.validate()?;

        let updated = {
            let mut activities = self.write_activities()?;
            let mut next = activities.clone();
            let activity = next
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;
            patch.apply(activity);
            let updated = activity.clone();
            self.store.save_activities(&next)?;
            *activities = next;
            updated
        };

        tracing::info!(id, "Updated activity");
        self.notify(LocalChange::ActivitiesChanged);
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        {
            let mut activities = self.write_activities()?;
            let next: Vec<Activity> = activities.iter().filter(|a| a.id != id).cloned().collect();
            if next.len() == activities.len() {
                return Err(AppError::NotFound(format!("Activity {} not found", id)));
            }
            self.store.save_activities(&next)?;
            *activities = next;
        }

        tracing::info!(id, "Removed activity");
        self.notify(LocalChange::ActivitiesChanged);
        Ok(())
    }

    /// Ids of activities that conflict in time with another one.
    pub fn overlaps(&self) -> Result<HashSet<String>> {
        Ok(find_overlaps(&self.read_activities()?))
    }

    // ─── Saved Places & Pins ─────────────────────────────────────

    pub fn saved_places(&self) -> Result<Vec<SavedPlace>> {
        Ok(self.read_saved_places()?.clone())
    }

    /// Replace saved places from a GeoJSON export.
    ///
    /// On any parse error the current saved places are left untouched.
    pub fn import_saved_places(&self, json_data: &str) -> Result<usize> {
        let places = parse_saved_places(json_data)?;
        let count = places.len();

        {
            let mut current = self.write_saved_places()?;
            self.store.save_saved_places(&places)?;
            *current = places;
        }

        tracing::info!(count, "Imported saved places");
        self.notify(LocalChange::SavedPlacesChanged);
        Ok(count)
    }

    pub fn clear_saved_places(&self) -> Result<()> {
        {
            let mut current = self.write_saved_places()?;
            self.store.save_saved_places(&[])?;
            current.clear();
        }
        tracing::info!("Cleared saved places");
        self.notify(LocalChange::SavedPlacesChanged);
        Ok(())
    }

    pub fn pins(&self, show_activities: bool, show_saved: bool) -> Result<Vec<Pin>> {
        let activities = self.read_activities()?;
        let saved_places = self.read_saved_places()?;
        Ok(merge_pins(
            &activities,
            &saved_places,
            show_activities,
            show_saved,
        ))
    }

    /// Remove all activities and saved places.
    pub fn reset(&self) -> Result<()> {
        {
            let mut activities = self.write_activities()?;
            let mut saved_places = self.write_saved_places()?;
            self.store.save_activities(&[])?;
            self.store.save_saved_places(&[])?;
            activities.clear();
            saved_places.clear();
        }
        tracing::info!("Itinerary reset");
        self.notify(LocalChange::ActivitiesChanged);
        self.notify(LocalChange::SavedPlacesChanged);
        Ok(())
    }
}

impl SyncHost for ItineraryService {
    fn activities(&self) -> Vec<Activity> {
        self.read_activities()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    fn saved_places(&self) -> Vec<SavedPlace> {
        self.read_saved_places()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Remote state replaces local state wholesale.
    fn apply_remote(&self, snapshot: RemoteSnapshot) -> anyhow::Result<()> {
        let RemoteSnapshot {
            activities,
            saved_places,
            ..
        } = snapshot;

        let mut current_activities = self.write_activities()?;
        let mut current_places = self.write_saved_places()?;
        self.store.save_activities(&activities)?;
        self.store.save_saved_places(&saved_places)?;
        *current_activities = activities;
        *current_places = saved_places;
        Ok(())
    }
}

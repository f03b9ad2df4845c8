// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local key-value blob store and the typed layer on top of it.
//!
//! Reads never fail the caller: a missing or unparseable blob degrades to
//! the empty/default value and is logged.

use crate::db::keys;
use crate::models::{Activity, SavedPlace, SyncSettings};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Errors from blob store IO.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Blob store IO error for {key}: {message}")]
    Io { key: String, message: String },

    #[error("Failed to encode {key}: {message}")]
    Encode { key: String, message: String },
}

/// Opaque string blobs addressed by key.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory blob store (tests, ephemeral sessions).
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: DashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key under a data directory.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            key: dir.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::info!(path = %dir.display(), "Opened local blob store");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.blob", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |e: std::io::Error| StoreError::Io {
            key: key.to_string(),
            message: e.to_string(),
        };

        // Write then rename so readers never see a torn blob.
        let path = self.path_for(key);
        let tmp = path.with_extension("blob.tmp");
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }
}

/// Typed access to the persisted itinerary state.
#[derive(Clone)]
pub struct Store {
    blobs: Arc<dyn BlobStore>,
}

impl Store {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Store backed by memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()))
    }

    // ─── Activities ──────────────────────────────────────────────

    pub fn load_activities(&self) -> Vec<Activity> {
        self.load_json(keys::ACTIVITIES)
    }

    pub fn save_activities(&self, activities: &[Activity]) -> Result<(), StoreError> {
        self.save_json(keys::ACTIVITIES, &activities)
    }

    // ─── Saved Places ────────────────────────────────────────────

    pub fn load_saved_places(&self) -> Vec<SavedPlace> {
        self.load_json(keys::SAVED_PLACES)
    }

    pub fn save_saved_places(&self, places: &[SavedPlace]) -> Result<(), StoreError> {
        self.save_json(keys::SAVED_PLACES, &places)
    }

    // ─── Maps Credential ─────────────────────────────────────────

    pub fn maps_api_key(&self) -> String {
        self.load_string(keys::MAPS_API_KEY)
    }

    pub fn set_maps_api_key(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.set(keys::MAPS_API_KEY, key.trim())
    }

    // ─── Sync Settings ───────────────────────────────────────────

    pub fn load_sync_settings(&self) -> SyncSettings {
        SyncSettings {
            config: self.load_string(keys::SYNC_CONFIG),
            share_code: self.load_string(keys::SYNC_SHARE_CODE),
            enabled: self.load_string(keys::SYNC_ENABLED).trim() == "true",
        }
    }

    pub fn save_sync_settings(&self, settings: &SyncSettings) -> Result<(), StoreError> {
        self.blobs.set(keys::SYNC_CONFIG, &settings.config)?;
        self.blobs
            .set(keys::SYNC_SHARE_CODE, settings.share_code.trim())?;
        self.blobs.set(
            keys::SYNC_ENABLED,
            if settings.enabled { "true" } else { "false" },
        )
    }

    // ─── Helpers ─────────────────────────────────────────────────

    fn load_string(&self, key: &str) -> String {
        match self.blobs.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read blob, using default");
                String::new()
            }
        }
    }

    fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = self.load_string(key);
        if raw.trim().is_empty() {
            return T::default();
        }
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Unparseable blob, using default");
            T::default()
        })
    }

    fn save_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.blobs.set(key, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;

    fn sample_activity() -> Activity {
        Activity {
            id: "3f6c1c1e-1111-4222-8333-444455556666".to_string(),
            date: "2024-05-01".to_string(),
            time: Some("10:00".to_string()),
            duration_minutes: Some(90),
            title: "Prado Museum".to_string(),
            city: Some("Madrid".to_string()),
            location: Some("https://maps.google.com/?q=40.4138,-3.6921".to_string()),
            comments: Some("Free after 18:00".to_string()),
            link: Some("https://www.museodelprado.es".to_string()),
            kind: ActivityType::Activity,
        }
    }

    #[test]
    fn test_activity_round_trip_preserves_all_fields() {
        let store = Store::in_memory();
        store.save_activities(&[sample_activity()]).unwrap();

        assert_eq!(store.load_activities(), vec![sample_activity()]);
    }

    #[test]
    fn test_corrupt_blobs_degrade_to_defaults() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.set(keys::ACTIVITIES, "{ not an array").unwrap();
        blobs.set(keys::SAVED_PLACES, "42").unwrap();
        blobs.set(keys::SYNC_ENABLED, "yes please").unwrap();
        let store = Store::new(blobs);

        assert!(store.load_activities().is_empty());
        assert!(store.load_saved_places().is_empty());
        assert!(!store.load_sync_settings().enabled);
    }

    #[test]
    fn test_sync_settings_round_trip() {
        let store = Store::in_memory();
        let settings = SyncSettings {
            config: r#"{"projectId":"trip"}"#.to_string(),
            share_code: "madrid-2024".to_string(),
            enabled: true,
        };
        store.save_sync_settings(&settings).unwrap();

        assert_eq!(store.load_sync_settings(), settings);
    }

    #[test]
    fn test_file_blob_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = Store::new(Arc::new(FileBlobStore::open(dir.path()).unwrap()));
        store.save_activities(&[sample_activity()]).unwrap();
        store.set_maps_api_key("  maps-key  ").unwrap();

        let reopened = Store::new(Arc::new(FileBlobStore::open(dir.path()).unwrap()));
        assert_eq!(reopened.load_activities(), vec![sample_activity()]);
        assert_eq!(reopened.maps_api_key(), "maps-key");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FileBlobStore::open(dir.path()).unwrap();
        assert_eq!(blobs.get(keys::ACTIVITIES).unwrap(), None);
    }
}

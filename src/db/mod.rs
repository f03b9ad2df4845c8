// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence: the local blob store and the remote trip document.

pub mod firestore;
pub mod remote;
pub mod store;

pub use firestore::FirestoreConnector;
pub use remote::{MemoryRemote, RemoteConnector, RemoteDocumentStore, RemoteError, Subscription};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore, Store, StoreError};

/// Collection names as constants.
pub mod collections {
    /// One document per share code
    pub const TRIPS: &str = "trips";
}

/// Local blob store keys.
pub mod keys {
    pub const ACTIVITIES: &str = "activities";
    pub const MAPS_API_KEY: &str = "maps_api_key";
    pub const SAVED_PLACES: &str = "saved_places";
    pub const SYNC_CONFIG: &str = "sync_config";
    pub const SYNC_SHARE_CODE: &str = "sync_share_code";
    /// "true" / "false"
    pub const SYNC_ENABLED: &str = "sync_enabled";
}

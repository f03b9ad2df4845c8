// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Remote sync settings and the shared trip document.

use crate::models::{Activity, SavedPlace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written with every push.
pub const SCHEMA_VERSION: u32 = 1;

/// User-entered sync configuration, persisted locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Service credentials as pasted by the user (JSON text)
    #[serde(default)]
    pub config: String,
    /// Identifier of the remote document to sync against
    #[serde(default)]
    pub share_code: String,
    #[serde(default)]
    pub enabled: bool,
}

impl SyncSettings {
    /// Whether a session may be started from these settings.
    pub fn is_startable(&self) -> bool {
        self.enabled && !self.config.trim().is_empty() && !self.share_code.trim().is_empty()
    }
}

/// Parsed service credentials (Firebase web app config shape).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncCredentials {
    #[serde(alias = "projectId")]
    pub project_id: String,
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default, alias = "authDomain")]
    pub auth_domain: Option<String>,
}

impl SyncCredentials {
    pub fn parse(config: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(config)
    }
}

/// The remote trip document, one per share code.
///
/// `updated_at` is assigned by the server on write and is never sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub saved_places: Vec<SavedPlace>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "firestore::serialize_as_optional_timestamp"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

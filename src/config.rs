// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Nothing here is secret: remote-sync credentials are entered by the user
//! and live in the local blob store, not in the environment.

use crate::db::collections;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period before local edits are pushed to the remote document.
pub const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 800;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Directory holding the local blob store
    pub data_dir: PathBuf,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Quiet period before a push is attempted
    pub sync_debounce: Duration,
    /// Firestore collection holding one document per share code
    pub firestore_collection: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every value has a default; unparseable numbers fall back to it.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(var("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        if data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("DATA_DIR"));
        }

        let firestore_collection =
            var("FIRESTORE_COLLECTION").unwrap_or_else(|| collections::TRIPS.to_string());
        if firestore_collection.trim().is_empty() || firestore_collection.contains('/') {
            return Err(ConfigError::Invalid("FIRESTORE_COLLECTION"));
        }

        Ok(Self {
            port: var("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            data_dir,
            frontend_url: var("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            sync_debounce: Duration::from_millis(
                var("SYNC_DEBOUNCE_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_DEBOUNCE_MS),
            ),
            firestore_collection,
        })
    }

    /// Config for tests: throwaway data dir, default debounce.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            data_dir: env::temp_dir().join("trip-planner-test"),
            frontend_url: "http://localhost:5173".to_string(),
            sync_debounce: Duration::from_millis(DEFAULT_SYNC_DEBOUNCE_MS),
            firestore_collection: collections::TRIPS.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_from_variables() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("SYNC_DEBOUNCE_MS", "not-a-number"),
            ("FIRESTORE_COLLECTION", "itineraries"),
        ]))
        .expect("Config should load");

        assert_eq!(config.port, 9090);
        assert_eq!(config.sync_debounce, Duration::from_millis(800));
        assert_eq!(config.firestore_collection, "itineraries");
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert_eq!(config.firestore_collection, collections::TRIPS);
    }

    #[test]
    fn test_nested_collection_rejected() {
        let result = Config::from_lookup(lookup(&[("FIRESTORE_COLLECTION", "trips/paris")]));
        assert!(matches!(result, Err(ConfigError::Invalid("FIRESTORE_COLLECTION"))));
    }
}

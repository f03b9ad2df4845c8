// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at `gcloud emulators firestore start`.
//!
//! Each test uses its own share code, so runs do not interfere.

use std::time::Duration;
use tokio::sync::mpsc;
use trip_planner::db::{FirestoreConnector, RemoteConnector};
use trip_planner::models::{RemoteSnapshot, SyncCredentials, SCHEMA_VERSION};

mod common;
use common::new_activity;

fn unique_share_code() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

fn credentials() -> SyncCredentials {
    SyncCredentials::parse(r#"{"projectId":"test-project"}"#).unwrap()
}

fn snapshot(title: &str) -> RemoteSnapshot {
    RemoteSnapshot {
        activities: vec![new_activity(title, "2024-05-01", Some("09:00")).into_activity()],
        saved_places: vec![],
        updated_at: None,
        version: SCHEMA_VERSION,
    }
}

#[tokio::test]
async fn test_merge_write_then_fetch() {
    require_emulator!();

    let connector = FirestoreConnector::new("trips");
    let remote = connector.connect(&credentials()).await.unwrap();
    let share_code = unique_share_code();

    assert!(remote.fetch(&share_code).await.unwrap().is_none());

    let written = snapshot("Breakfast");
    remote.merge_write(&share_code, &written).await.unwrap();

    let fetched = remote.fetch(&share_code).await.unwrap().unwrap();
    assert_eq!(fetched.activities, written.activities);
    assert_eq!(fetched.version, SCHEMA_VERSION);
    assert!(fetched.updated_at.is_some(), "server timestamp should be set");
}

#[tokio::test]
async fn test_connector_reuses_client_per_project() {
    require_emulator!();

    let connector = FirestoreConnector::new("trips");
    let first = connector.connect(&credentials()).await.unwrap();
    let second = connector.connect(&credentials()).await.unwrap();

    let share_code = unique_share_code();
    first.merge_write(&share_code, &snapshot("Shared")).await.unwrap();
    assert!(second.fetch(&share_code).await.unwrap().is_some());
}

#[tokio::test]
async fn test_subscription_delivers_writes() {
    require_emulator!();

    let connector = FirestoreConnector::new("trips");
    let remote = connector.connect(&credentials()).await.unwrap();
    let share_code = unique_share_code();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = remote.subscribe(&share_code, tx).await.unwrap();

    remote
        .merge_write(&share_code, &snapshot("Lunch"))
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Some(s) if !s.activities.is_empty() => return Some(s),
                Some(_) => continue,
                None => return None,
            }
        }
    })
    .await
    .expect("timed out waiting for listener")
    .expect("listener closed");

    assert_eq!(received.activities[0].title, "Lunch");
    subscription.close().await;
}

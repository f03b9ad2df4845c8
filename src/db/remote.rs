// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote trip document store abstraction.
//!
//! The sync engine talks to the remote side only through these traits:
//! - `RemoteConnector` turns credentials into a (possibly cached) client,
//! - `RemoteDocumentStore` reads, merge-writes and watches one document
//!   per share code.

use crate::models::{RemoteSnapshot, SyncCredentials};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Errors from the remote side.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Anonymous sign-in failed: {0}")]
    Auth(String),

    #[error("Remote read failed: {0}")]
    Read(String),

    #[error("Remote write failed: {0}")]
    Write(String),

    #[error("Failed to subscribe: {0}")]
    Subscribe(String),
}

/// Creates clients for a remote project, reusing existing handles.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &SyncCredentials,
    ) -> Result<Arc<dyn RemoteDocumentStore>, RemoteError>;
}

/// One trip document per share code.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Obtain an anonymous identity for subsequent calls.
    async fn sign_in_anonymously(&self) -> Result<(), RemoteError>;

    async fn fetch(&self, share_code: &str) -> Result<Option<RemoteSnapshot>, RemoteError>;

    /// Merge-write the activities, saved places and version fields.
    ///
    /// Other fields are preserved; the written fields are replaced wholesale.
    /// `updated_at` is set by the server.
    async fn merge_write(
        &self,
        share_code: &str,
        snapshot: &RemoteSnapshot,
    ) -> Result<(), RemoteError>;

    /// Deliver every change of the document to `sink` until the returned
    /// subscription is closed.
    async fn subscribe(
        &self,
        share_code: &str,
        sink: UnboundedSender<RemoteSnapshot>,
    ) -> Result<Subscription, RemoteError>;
}

/// Handle to a live change subscription.
///
/// Closing (or dropping) it stops delivery.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// `cancel` stops delivery; `task`, if any, is awaited on close.
    pub fn new(cancel: impl FnOnce() + Send + 'static, task: Option<JoinHandle<()>>) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            task,
        }
    }

    pub async fn close(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Subscription task ended abnormally");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

// ─── In-Memory Remote ────────────────────────────────────────────

/// In-process remote store.
///
/// Behaves like the real document store (merge writes, server timestamps,
/// change notifications for every write) and counts calls so tests can
/// observe the sync engine.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<MemoryRemoteInner>,
}

#[derive(Default)]
struct MemoryRemoteInner {
    documents: DashMap<String, RemoteSnapshot>,
    watchers: DashMap<String, Vec<(u64, UnboundedSender<RemoteSnapshot>)>>,
    next_watcher: AtomicU64,
    connects: AtomicUsize,
    sign_ins: AtomicUsize,
    writes: AtomicUsize,
    fail_auth: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every anonymous sign-in fail.
    pub fn set_fail_auth(&self, fail: bool) {
        self.inner.fail_auth.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn sign_in_count(&self) -> usize {
        self.inner.sign_ins.load(Ordering::SeqCst)
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn document(&self, share_code: &str) -> Option<RemoteSnapshot> {
        self.inner.documents.get(share_code).map(|d| d.value().clone())
    }

    pub fn watcher_count(&self, share_code: &str) -> usize {
        self.inner
            .watchers
            .get(share_code)
            .map(|w| w.len())
            .unwrap_or(0)
    }

    /// Write a document as another device would.
    pub fn publish(&self, share_code: &str, snapshot: RemoteSnapshot) {
        self.inner.store_and_notify(share_code, snapshot);
    }
}

impl MemoryRemoteInner {
    fn store_and_notify(&self, share_code: &str, mut snapshot: RemoteSnapshot) {
        snapshot.updated_at = Some(Utc::now());
        self.documents
            .insert(share_code.to_string(), snapshot.clone());

        if let Some(mut watchers) = self.watchers.get_mut(share_code) {
            watchers.retain(|(_, sink)| sink.send(snapshot.clone()).is_ok());
        }
    }
}

#[async_trait]
impl RemoteConnector for MemoryRemote {
    async fn connect(
        &self,
        credentials: &SyncCredentials,
    ) -> Result<Arc<dyn RemoteDocumentStore>, RemoteError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(project = %credentials.project_id, "Connected to in-memory remote");
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryRemote {
    async fn sign_in_anonymously(&self) -> Result<(), RemoteError> {
        self.inner.sign_ins.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_auth.load(Ordering::SeqCst) {
            return Err(RemoteError::Auth("anonymous sign-in disabled".to_string()));
        }
        Ok(())
    }

    async fn fetch(&self, share_code: &str) -> Result<Option<RemoteSnapshot>, RemoteError> {
        Ok(self.document(share_code))
    }

    async fn merge_write(
        &self,
        share_code: &str,
        snapshot: &RemoteSnapshot,
    ) -> Result<(), RemoteError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Write("writes disabled".to_string()));
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.store_and_notify(share_code, snapshot.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        share_code: &str,
        sink: UnboundedSender<RemoteSnapshot>,
    ) -> Result<Subscription, RemoteError> {
        let id = self.inner.next_watcher.fetch_add(1, Ordering::SeqCst);
        self.inner
            .watchers
            .entry(share_code.to_string())
            .or_default()
            .push((id, sink));

        let inner = self.inner.clone();
        let share_code = share_code.to_string();
        Ok(Subscription::new(
            move || {
                if let Some(mut watchers) = inner.watchers.get_mut(&share_code) {
                    watchers.retain(|(watcher, _)| *watcher != id);
                }
            },
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SCHEMA_VERSION;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_merge_write_sets_server_timestamp_and_notifies() {
        let remote = MemoryRemote::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = remote.subscribe("trip", tx).await.unwrap();

        let snapshot = RemoteSnapshot {
            version: SCHEMA_VERSION,
            ..Default::default()
        };
        remote.merge_write("trip", &snapshot).await.unwrap();

        let stored = remote.document("trip").unwrap();
        assert!(stored.updated_at.is_some());
        assert_eq!(rx.recv().await.unwrap().version, SCHEMA_VERSION);

        subscription.close().await;
        assert_eq!(remote.watcher_count("trip"), 0);
    }

    #[tokio::test]
    async fn test_dropping_subscription_stops_delivery() {
        let remote = MemoryRemote::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(remote.subscribe("trip", tx).await.unwrap());

        remote.publish("trip", RemoteSnapshot::default());
        assert!(rx.recv().await.is_none());
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bidirectional sync of the itinerary with a remote trip document.
//!
//! Session lifecycle: `Idle → Starting → Active → Stopped`.
//!
//! - Push: every `LocalChange` re-arms a debounce timer; after a quiet
//!   period the current activities and saved places are merge-written.
//! - Pull: the document is fetched once at start and then watched; every
//!   snapshot received overwrites local state (last write wins).
//!
//! Failures on either path are logged and never retried; the next local
//! change or remote notification is the retry.

use crate::db::remote::{RemoteConnector, RemoteDocumentStore, Subscription};
use crate::models::{Activity, RemoteSnapshot, SavedPlace, SyncCredentials, SyncSettings, SCHEMA_VERSION};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A local mutation that should eventually reach the remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalChange {
    ActivitiesChanged,
    SavedPlacesChanged,
}

/// Receives local change notifications.
pub trait ChangeListener: Send + Sync {
    fn on_local_change(&self, change: LocalChange);
}

/// The local side of a sync session.
///
/// Accessors are read at push time, so the engine never holds its own copy
/// of the itinerary.
pub trait SyncHost: Send + Sync + 'static {
    fn activities(&self) -> Vec<Activity>;
    fn saved_places(&self) -> Vec<SavedPlace>;
    /// Replace local state with a remote snapshot.
    fn apply_remote(&self, snapshot: RemoteSnapshot) -> anyhow::Result<()>;
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SyncState {
    Idle = 0,
    Starting = 1,
    Active = 2,
    Stopped = 3,
}

impl SyncState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SyncState::Starting,
            2 => SyncState::Active,
            3 => SyncState::Stopped,
            _ => SyncState::Idle,
        }
    }
}

/// Counters exposed for status reporting.
#[derive(Debug, Default)]
struct SyncCounters {
    pushes: AtomicU64,
    push_failures: AtomicU64,
    applied: AtomicU64,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: SyncState,
    pub share_code: Option<String>,
    pub pushes: u64,
    pub push_failures: u64,
    pub applied: u64,
}

/// Resources owned by an active session, released together on stop.
struct Session {
    share_code: String,
    changes: UnboundedSender<LocalChange>,
    subscription: Option<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

/// Sync engine; one session at a time.
pub struct SyncEngine {
    connector: Arc<dyn RemoteConnector>,
    host: Arc<dyn SyncHost>,
    debounce: Duration,
    state: AtomicU8,
    /// Bumped by every start attempt and every stop; a start only
    /// activates if no other lifecycle call intervened.
    generation: AtomicU64,
    /// Also serializes lifecycle transitions.
    session: Mutex<Option<Session>>,
    counters: Arc<SyncCounters>,
}

impl SyncEngine {
    pub fn new(
        connector: Arc<dyn RemoteConnector>,
        host: Arc<dyn SyncHost>,
        debounce: Duration,
    ) -> Self {
        Self {
            connector,
            host,
            debounce,
            state: AtomicU8::new(SyncState::Idle as u8),
            generation: AtomicU64::new(0),
            session: Mutex::new(None),
            counters: Arc::new(SyncCounters::default()),
        }
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn status(&self) -> SyncStatus {
        let share_code = self
            .session
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.share_code.clone()));
        SyncStatus {
            state: self.state(),
            share_code,
            pushes: self.counters.pushes.load(Ordering::SeqCst),
            push_failures: self.counters.push_failures.load(Ordering::SeqCst),
            applied: self.counters.applied.load(Ordering::SeqCst),
        }
    }

    /// Claim the start latch: only one caller moves the engine to `Starting`.
    ///
    /// Returns the generation of this attempt.
    fn try_begin(&self) -> Option<u64> {
        let _lifecycle = self.session.lock().ok()?;
        let claimed = [SyncState::Idle, SyncState::Stopped].iter().any(|from| {
            self.state
                .compare_exchange(
                    *from as u8,
                    SyncState::Starting as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
        });
        claimed.then(|| self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Install the session if `generation` is still the latest lifecycle call.
    fn activate(&self, generation: u64, session: Session) -> Result<(), Session> {
        let Ok(mut slot) = self.session.lock() else {
            return Err(session);
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(session);
        }
        self.state.store(SyncState::Active as u8, Ordering::SeqCst);
        *slot = Some(session);
        Ok(())
    }

    /// Record a failed start, unless a later call already moved on.
    fn abandon(&self, generation: u64) {
        if let Ok(_lifecycle) = self.session.lock() {
            if self.generation.load(Ordering::SeqCst) == generation {
                self.state.store(SyncState::Stopped as u8, Ordering::SeqCst);
            }
        }
    }

    /// Start a session from the given settings.
    ///
    /// Returns `true` if the session reached `Active`. Failures are logged,
    /// not returned: a bad config or unreachable remote leaves sync off.
    pub async fn start(&self, settings: &SyncSettings) -> bool {
        if !settings.is_startable() {
            tracing::debug!("Sync not started: disabled or incomplete settings");
            return false;
        }
        let Some(generation) = self.try_begin() else {
            tracing::debug!(state = ?self.state(), "Sync already started");
            return false;
        };

        let share_code = settings.share_code.trim().to_string();
        match self.open_session(settings, &share_code).await {
            Some(session) => match self.activate(generation, session) {
                Ok(()) => {
                    tracing::info!(share_code = %share_code, "Sync session active");
                    true
                }
                // stop(), and possibly another start, ran while we were connecting.
                Err(session) => {
                    tracing::info!(share_code = %share_code, "Sync stopped during startup");
                    close_session(session).await;
                    false
                }
            },
            None => {
                self.abandon(generation);
                false
            }
        }
    }

    async fn open_session(&self, settings: &SyncSettings, share_code: &str) -> Option<Session> {
        let credentials = match SyncCredentials::parse(&settings.config) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Sync config is not valid credentials JSON");
                return None;
            }
        };

        let remote = match self.connector.connect(&credentials).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(project = %credentials.project_id, error = %e, "Failed to connect to remote");
                return None;
            }
        };

        if let Err(e) = remote.sign_in_anonymously().await {
            tracing::warn!(error = %e, "Anonymous sign-in failed, continuing unauthenticated");
        }

        match remote.fetch(share_code).await {
            Ok(Some(snapshot)) => apply_snapshot(self.host.as_ref(), &self.counters, snapshot),
            Ok(None) => tracing::info!(share_code, "No remote document yet"),
            Err(e) => tracing::warn!(share_code, error = %e, "Initial fetch failed"),
        }

        let mut tasks = Vec::with_capacity(2);

        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        let subscription = match remote.subscribe(share_code, remote_tx).await {
            Ok(sub) => {
                tasks.push(tokio::spawn(run_apply_loop(
                    remote_rx,
                    self.host.clone(),
                    self.counters.clone(),
                )));
                Some(sub)
            }
            Err(e) => {
                tracing::warn!(share_code, error = %e, "Failed to watch remote document");
                None
            }
        };

        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        tasks.push(tokio::spawn(run_debounce_loop(
            changes_rx,
            self.debounce,
            Pusher {
                remote,
                host: self.host.clone(),
                counters: self.counters.clone(),
                share_code: share_code.to_string(),
            },
        )));

        Some(Session {
            share_code: share_code.to_string(),
            changes: changes_tx,
            subscription,
            tasks,
        })
    }

    /// Forward a local change to the active session, if any.
    pub fn notify(&self, change: LocalChange) {
        let Ok(slot) = self.session.lock() else {
            return;
        };
        match slot.as_ref() {
            Some(session) => {
                if session.changes.send(change).is_err() {
                    tracing::warn!(?change, "Sync session is shutting down, change dropped");
                }
            }
            None => tracing::trace!(?change, "No sync session, change not pushed"),
        }
    }

    /// End the session: stop watching, drop pending pushes.
    ///
    /// A push already in flight runs to completion on its own.
    pub async fn stop(&self) {
        let session = {
            let Ok(mut slot) = self.session.lock() else {
                return;
            };
            self.generation.fetch_add(1, Ordering::SeqCst);
            let previous = SyncState::from_u8(
                self.state
                    .swap(SyncState::Stopped as u8, Ordering::SeqCst),
            );
            if previous == SyncState::Idle {
                // Never started; keep reporting idle.
                self.state.store(SyncState::Idle as u8, Ordering::SeqCst);
            }
            slot.take()
        };

        if let Some(session) = session {
            tracing::info!(share_code = %session.share_code, "Stopping sync session");
            close_session(session).await;
        }
    }
}

impl ChangeListener for SyncEngine {
    fn on_local_change(&self, change: LocalChange) {
        self.notify(change);
    }
}

async fn close_session(session: Session) {
    let Session {
        changes,
        subscription,
        tasks,
        ..
    } = session;
    drop(changes);
    if let Some(subscription) = subscription {
        subscription.close().await;
    }
    for task in tasks {
        task.abort();
    }
}

fn apply_snapshot(host: &dyn SyncHost, counters: &SyncCounters, snapshot: RemoteSnapshot) {
    let activities = snapshot.activities.len();
    let saved_places = snapshot.saved_places.len();
    match host.apply_remote(snapshot) {
        Ok(()) => {
            counters.applied.fetch_add(1, Ordering::SeqCst);
            tracing::info!(activities, saved_places, "Applied remote snapshot");
        }
        Err(e) => tracing::error!(error = %e, "Failed to apply remote snapshot"),
    }
}

async fn run_apply_loop(
    mut snapshots: UnboundedReceiver<RemoteSnapshot>,
    host: Arc<dyn SyncHost>,
    counters: Arc<SyncCounters>,
) {
    while let Some(snapshot) = snapshots.recv().await {
        apply_snapshot(host.as_ref(), &counters, snapshot);
    }
}

/// Everything a push needs, cloned into each spawned push.
#[derive(Clone)]
struct Pusher {
    remote: Arc<dyn RemoteDocumentStore>,
    host: Arc<dyn SyncHost>,
    counters: Arc<SyncCounters>,
    share_code: String,
}

impl Pusher {
    async fn push(self) {
        let snapshot = RemoteSnapshot {
            activities: self.host.activities(),
            saved_places: self.host.saved_places(),
            updated_at: None,
            version: SCHEMA_VERSION,
        };

        match self.remote.merge_write(&self.share_code, &snapshot).await {
            Ok(()) => {
                self.counters.pushes.fetch_add(1, Ordering::SeqCst);
                tracing::info!(
                    share_code = %self.share_code,
                    activities = snapshot.activities.len(),
                    saved_places = snapshot.saved_places.len(),
                    "Pushed itinerary"
                );
            }
            Err(e) => {
                self.counters.push_failures.fetch_add(1, Ordering::SeqCst);
                tracing::error!(share_code = %self.share_code, error = %e, "Push failed");
            }
        }
    }
}

/// Coalesce bursts of changes into one push per quiet period.
async fn run_debounce_loop(
    mut changes: UnboundedReceiver<LocalChange>,
    debounce: Duration,
    pusher: Pusher,
) {
    while let Some(first) = changes.recv().await {
        let mut coalesced = 1usize;
        loop {
            match tokio::time::timeout(debounce, changes.recv()).await {
                Ok(Some(_)) => coalesced += 1,
                Ok(None) => {
                    tracing::debug!(coalesced, "Session closed, pending push dropped");
                    return;
                }
                Err(_) => break,
            }
        }

        tracing::debug!(?first, coalesced, "Debounce elapsed, pushing");
        // Spawned so that stopping the session never cancels a push.
        tokio::spawn(pusher.clone().push());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::remote::RemoteError;
    use crate::db::MemoryRemote;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    /// Holds each connect until the test releases it.
    struct GatedConnector {
        remote: MemoryRemote,
        gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
        waiting: AtomicUsize,
    }

    #[async_trait]
    impl RemoteConnector for GatedConnector {
        async fn connect(
            &self,
            credentials: &SyncCredentials,
        ) -> Result<Arc<dyn RemoteDocumentStore>, RemoteError> {
            let gate = self.gates.lock().unwrap().pop_front();
            self.waiting.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.remote.connect(credentials).await
        }
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        while !done() {
            tokio::task::yield_now().await;
        }
    }

    struct NullHost;

    impl SyncHost for NullHost {
        fn activities(&self) -> Vec<Activity> {
            Vec::new()
        }
        fn saved_places(&self) -> Vec<SavedPlace> {
            Vec::new()
        }
        fn apply_remote(&self, _snapshot: RemoteSnapshot) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn settings(config: &str) -> SyncSettings {
        SyncSettings {
            config: config.to_string(),
            share_code: "trip".to_string(),
            enabled: true,
        }
    }

    fn engine(remote: &MemoryRemote) -> SyncEngine {
        SyncEngine::new(
            Arc::new(remote.clone()),
            Arc::new(NullHost),
            Duration::from_millis(800),
        )
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            SyncState::Idle,
            SyncState::Starting,
            SyncState::Active,
            SyncState::Stopped,
        ] {
            assert_eq!(SyncState::from_u8(state as u8), state);
        }
    }

    #[tokio::test]
    async fn test_malformed_config_fails_session() {
        let remote = MemoryRemote::new();
        let engine = engine(&remote);

        assert!(!engine.start(&settings("{not json")).await);
        assert_eq!(engine.state(), SyncState::Stopped);
        assert_eq!(remote.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_start_is_guarded() {
        let remote = MemoryRemote::new();
        let engine = engine(&remote);
        let settings = settings(r#"{"projectId":"p"}"#);

        assert!(engine.start(&settings).await);
        assert!(!engine.start(&settings).await);
        assert_eq!(remote.connect_count(), 1);
        assert_eq!(engine.state(), SyncState::Active);

        engine.stop().await;
        assert_eq!(engine.state(), SyncState::Stopped);
        assert!(engine.start(&settings).await);
    }

    #[tokio::test]
    async fn test_stop_before_start_stays_idle() {
        let engine = engine(&MemoryRemote::new());
        engine.stop().await;
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_superseded_start_never_activates() {
        let remote = MemoryRemote::new();
        let (release_old, old_gate) = oneshot::channel();
        let (release_new, new_gate) = oneshot::channel();
        let connector = Arc::new(GatedConnector {
            remote: remote.clone(),
            gates: Mutex::new(VecDeque::from([old_gate, new_gate])),
            waiting: AtomicUsize::new(0),
        });
        let engine = Arc::new(SyncEngine::new(
            connector.clone(),
            Arc::new(NullHost),
            Duration::from_millis(800),
        ));
        let start = |share_code: &str| {
            let engine = engine.clone();
            let settings = SyncSettings {
                share_code: share_code.to_string(),
                ..settings(r#"{"projectId":"p"}"#)
            };
            tokio::spawn(async move { engine.start(&settings).await })
        };

        let old = start("old-trip");
        wait_until(|| connector.waiting.load(Ordering::SeqCst) == 1).await;
        engine.stop().await;
        let new = start("new-trip");
        wait_until(|| connector.waiting.load(Ordering::SeqCst) == 2).await;
        assert_eq!(engine.state(), SyncState::Starting);

        // The old attempt finishes while the new one is still starting.
        release_old.send(()).unwrap();
        assert!(!old.await.unwrap());
        assert_eq!(engine.state(), SyncState::Starting);
        assert_eq!(remote.watcher_count("old-trip"), 0);

        release_new.send(()).unwrap();
        assert!(new.await.unwrap());
        assert_eq!(engine.state(), SyncState::Active);
        assert_eq!(engine.status().share_code.as_deref(), Some("new-trip"));
        assert_eq!(remote.watcher_count("new-trip"), 1);
    }

    #[tokio::test]
    async fn test_stop_during_startup_leaves_engine_stopped() {
        let remote = MemoryRemote::new();
        let (release, gate) = oneshot::channel();
        let connector = Arc::new(GatedConnector {
            remote: remote.clone(),
            gates: Mutex::new(VecDeque::from([gate])),
            waiting: AtomicUsize::new(0),
        });
        let engine = Arc::new(SyncEngine::new(
            connector.clone(),
            Arc::new(NullHost),
            Duration::from_millis(800),
        ));

        let pending = tokio::spawn({
            let engine = engine.clone();
            async move { engine.start(&settings(r#"{"projectId":"p"}"#)).await }
        });
        wait_until(|| connector.waiting.load(Ordering::SeqCst) == 1).await;
        engine.stop().await;
        release.send(()).unwrap();

        assert!(!pending.await.unwrap());
        assert_eq!(engine.state(), SyncState::Stopped);
        assert_eq!(remote.watcher_count("trip"), 0);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed remote trip document store.
//!
//! Clients are created lazily on first connect and cached per project, so
//! re-enabling sync reuses the existing handle. Authentication is a Firebase
//! anonymous sign-in whose ID token is fed to the gRPC client through an
//! external token source. ID tokens live for an hour; the token source
//! exchanges the refresh token for a new one shortly before expiry.

use crate::db::remote::{RemoteConnector, RemoteDocumentStore, RemoteError, Subscription};
use crate::models::{RemoteSnapshot, SyncCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use firestore::{
    path, paths, FirestoreDb, FirestoreDbOptions, FirestoreListenEvent, FirestoreListenerTarget,
    FirestoreMemListenStateStorage, FirestoreTransformServerValue,
};
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc::UnboundedSender, oneshot};

const SIGN_UP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signUp";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Refresh this many seconds before the ID token expires.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Listener target id; one document per listener.
const LISTEN_TARGET: u32 = 17;

/// Placeholder bearer token used until (or instead of) a real sign-in.
const UNAUTHENTICATED_TOKEN: &str = "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJhbm9ueW1vdXMifQ.";

/// A signed-in anonymous identity.
#[derive(Debug, Clone, PartialEq)]
struct IdSession {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl IdSession {
    /// Build a session from a token grant; `expires_in` is seconds as a string.
    fn from_grant(
        id_token: String,
        refresh_token: String,
        expires_in: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, RemoteError> {
        let seconds: i64 = expires_in
            .trim()
            .parse()
            .map_err(|_| RemoteError::Auth(format!("bad expiresIn: {:?}", expires_in)))?;
        Ok(Self {
            id_token,
            refresh_token,
            expires_at: now + chrono::Duration::seconds(seconds),
        })
    }

    /// When the token source should hand out a fresh token.
    fn refresh_at(&self) -> DateTime<Utc> {
        self.expires_at - chrono::Duration::seconds(REFRESH_MARGIN_SECS)
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_at()
    }
}

/// Identity Toolkit sign-up response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    #[serde(default)]
    local_id: Option<String>,
}

/// Secure Token refresh response.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// Anonymous Firebase auth for one project.
struct AnonymousAuth {
    http: reqwest::Client,
    api_key: Option<String>,
    session: RwLock<Option<IdSession>>,
}

impl AnonymousAuth {
    fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            session: RwLock::new(None),
        }
    }

    fn api_key(&self) -> Result<&str, RemoteError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| RemoteError::Auth("credentials have no apiKey".to_string()))
    }

    fn current(&self) -> Option<IdSession> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    fn install(&self, session: IdSession) {
        if let Ok(mut slot) = self.session.write() {
            *slot = Some(session);
        }
    }

    async fn sign_in(&self) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(SIGN_UP_URL)
            .query(&[("key", self.api_key()?)])
            .json(&serde_json::json!({ "returnSecureToken": true }))
            .send()
            .await
            .map_err(|e| RemoteError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!("{}: {}", status, body)));
        }

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Auth(e.to_string()))?;

        self.install(IdSession::from_grant(
            body.id_token,
            body.refresh_token,
            &body.expires_in,
            Utc::now(),
        )?);
        tracing::info!(uid = ?body.local_id, "Signed in anonymously");
        Ok(())
    }

    async fn refresh(&self, session: &IdSession) -> Result<IdSession, RemoteError> {
        let response = self
            .http
            .post(REFRESH_URL)
            .query(&[("key", self.api_key()?)])
            .json(&serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": session.refresh_token,
            }))
            .send()
            .await
            .map_err(|e| RemoteError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!("{}: {}", status, body)));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Auth(e.to_string()))?;

        let refreshed =
            IdSession::from_grant(body.id_token, body.refresh_token, &body.expires_in, Utc::now())?;
        self.install(refreshed.clone());
        tracing::debug!(expires_at = %refreshed.expires_at, "Refreshed ID token");
        Ok(refreshed)
    }

    /// Bearer token and the time it should next be asked for.
    async fn bearer(&self) -> (String, DateTime<Utc>) {
        let now = Utc::now();
        let Some(session) = self.current() else {
            // Expire immediately so a later sign-in is picked up.
            return (UNAUTHENTICATED_TOKEN.to_string(), now);
        };
        if !session.needs_refresh(now) {
            return (session.id_token.clone(), session.refresh_at());
        }

        match self.refresh(&session).await {
            Ok(fresh) => {
                let at = fresh.refresh_at();
                (fresh.id_token, at)
            }
            Err(e) => {
                tracing::warn!(error = %e, "ID token refresh failed");
                if now < session.expires_at {
                    (session.id_token, now)
                } else {
                    (UNAUTHENTICATED_TOKEN.to_string(), now)
                }
            }
        }
    }
}

/// Lazily connects to Firestore projects and caches the handles.
#[derive(Clone)]
pub struct FirestoreConnector {
    collection: String,
    http: reqwest::Client,
    clients: Arc<DashMap<String, Arc<FirestoreTripStore>>>,
}

impl FirestoreConnector {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            http: reqwest::Client::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    async fn create_store(
        &self,
        credentials: &SyncCredentials,
    ) -> Result<FirestoreTripStore, RemoteError> {
        let auth = Arc::new(AnonymousAuth::new(
            self.http.clone(),
            credentials.api_key.clone(),
        ));
        let auth_for_source = auth.clone();

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(move || {
            let auth = auth_for_source.clone();
            async move {
                let (value, expiry) = auth.bearer().await;
                Ok(gcloud_sdk::Token {
                    token_type: "Bearer".to_string(),
                    token: gcloud_sdk::SecretValue::new(value.into()),
                    expiry,
                })
            }
        });

        let options = FirestoreDbOptions::new(credentials.project_id.clone());
        let client = FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| RemoteError::Connect(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = %credentials.project_id, "Connected to Firestore");

        Ok(FirestoreTripStore {
            client,
            collection: self.collection.clone(),
            auth,
        })
    }
}

#[async_trait]
impl RemoteConnector for FirestoreConnector {
    async fn connect(
        &self,
        credentials: &SyncCredentials,
    ) -> Result<Arc<dyn RemoteDocumentStore>, RemoteError> {
        if let Some(existing) = self.clients.get(&credentials.project_id) {
            tracing::debug!(project = %credentials.project_id, "Reusing Firestore client");
            let store: Arc<dyn RemoteDocumentStore> = existing.value().clone();
            return Ok(store);
        }

        let store = Arc::new(self.create_store(credentials).await?);
        self.clients
            .insert(credentials.project_id.clone(), store.clone());
        Ok(store)
    }
}

/// Firestore client bound to the trips collection.
pub struct FirestoreTripStore {
    client: FirestoreDb,
    collection: String,
    auth: Arc<AnonymousAuth>,
}

#[async_trait]
impl RemoteDocumentStore for FirestoreTripStore {
    async fn sign_in_anonymously(&self) -> Result<(), RemoteError> {
        self.auth.sign_in().await
    }

    async fn fetch(&self, share_code: &str) -> Result<Option<RemoteSnapshot>, RemoteError> {
        self.client
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(share_code)
            .await
            .map_err(|e| RemoteError::Read(e.to_string()))
    }

    async fn merge_write(
        &self,
        share_code: &str,
        snapshot: &RemoteSnapshot,
    ) -> Result<(), RemoteError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(paths!(RemoteSnapshot::{activities, saved_places, version}))
            .in_col(&self.collection)
            .document_id(share_code)
            .object(snapshot)
            .transforms(|t| {
                t.fields([t
                    .field(path!(RemoteSnapshot::updated_at))
                    .server_value(FirestoreTransformServerValue::RequestTime)])
            })
            .execute()
            .await
            .map_err(|e| RemoteError::Write(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        share_code: &str,
        sink: UnboundedSender<RemoteSnapshot>,
    ) -> Result<Subscription, RemoteError> {
        let mut listener = self
            .client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(|e| RemoteError::Subscribe(e.to_string()))?;

        self.client
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .batch_listen([share_code.to_string()])
            .add_target(FirestoreListenerTarget::new(LISTEN_TARGET), &mut listener)
            .map_err(|e| RemoteError::Subscribe(e.to_string()))?;

        listener
            .start(move |event| {
                let sink = sink.clone();
                async move {
                    if let FirestoreListenEvent::DocumentChange(ref change) = event {
                        if let Some(doc) = &change.document {
                            match FirestoreDb::deserialize_doc_to::<RemoteSnapshot>(doc) {
                                Ok(snapshot) => {
                                    let _ = sink.send(snapshot);
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "Undecodable remote snapshot");
                                }
                            }
                        }
                    }
                    Ok(())
                }
            })
            .await
            .map_err(|e| RemoteError::Subscribe(e.to_string()))?;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let share_code = share_code.to_string();
        let task = tokio::spawn(async move {
            // Either an explicit stop or the handle being dropped ends the listener.
            let _ = stop_rx.await;
            if let Err(e) = listener.shutdown().await {
                tracing::warn!(share_code, error = %e, "Listener shutdown failed");
            }
        });

        Ok(Subscription::new(
            move || {
                let _ = stop_tx.send(());
            },
            Some(task),
        ))
    }
}

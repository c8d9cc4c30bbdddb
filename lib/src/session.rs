// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Approved application sessions
//!
//! One [Session] is kept per `(actor, permission, chain_id)`, adding a session
//! for an existing key replaces it. The list is persisted as JSON under
//! [SESSIONS_KEY] after every change.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use esr_abi::{Name, PublicKey, TimePointSec};
use esr_core::{ChainId, PermissionLevel};

use crate::{store::StateStore, Error};

/// State store key for the session list
pub const SESSIONS_KEY: &str = "sessions";

/// Approved application link
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Session {
    pub chain_id: ChainId,
    pub actor: Name,
    pub permission: Name,
    /// Application request key
    pub public_key: PublicKey,
    /// Application name
    pub name: String,
    pub created: TimePointSec,
    pub last_used: TimePointSec,
}

impl Session {
    pub fn new(
        chain_id: ChainId,
        signer: PermissionLevel,
        public_key: PublicKey,
        name: impl Into<String>,
        now: TimePointSec,
    ) -> Self {
        Self {
            chain_id,
            actor: signer.actor,
            permission: signer.permission,
            public_key,
            name: name.into(),
            created: now,
            last_used: now,
        }
    }

    pub fn signer(&self) -> PermissionLevel {
        PermissionLevel::new(self.actor, self.permission)
    }

    fn is_for(&self, chain_id: &ChainId, signer: &PermissionLevel) -> bool {
        &self.chain_id == chain_id && self.actor == signer.actor && self.permission == signer.permission
    }
}

/// Session list with write-then-persist semantics
pub struct SessionStore {
    store: Arc<dyn StateStore>,
    sessions: Mutex<Vec<Session>>,
}

impl SessionStore {
    /// Load sessions from `store`, an unreadable list is discarded
    pub async fn load(store: Arc<dyn StateStore>) -> Result<Self, Error> {
        let sessions = match store.get(SESSIONS_KEY).await? {
            Some(s) => match serde_json::from_str::<Vec<Session>>(&s) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Discarding unreadable session list: {}", e);
                    vec![]
                }
            },
            None => vec![],
        };

        debug!("Loaded {} sessions", sessions.len());

        Ok(Self {
            store,
            sessions: Mutex::new(sessions),
        })
    }

    /// Add a session, replacing any session for the same signer and chain
    pub async fn add(&self, session: Session) -> Result<(), Error> {
        let mut sessions = self.sessions.lock().await;

        let signer = session.signer();
        sessions.retain(|s| !s.is_for(&session.chain_id, &signer));

        debug!(
            "Adding session for {} on {} ({})",
            signer, session.chain_id, session.name
        );
        sessions.push(session);

        self.persist(&sessions).await
    }

    /// Remove the session for `signer` on `chain_id`, returns whether one existed
    pub async fn remove(&self, chain_id: &ChainId, signer: &PermissionLevel) -> Result<bool, Error> {
        let mut sessions = self.sessions.lock().await;

        let n = sessions.len();
        sessions.retain(|s| !s.is_for(chain_id, signer));
        if sessions.len() == n {
            return Ok(false);
        }

        self.persist(&sessions).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), Error> {
        let mut sessions = self.sessions.lock().await;
        sessions.clear();
        self.persist(&sessions).await
    }

    /// Update the last used time for a session
    pub async fn touch(
        &self,
        chain_id: &ChainId,
        signer: &PermissionLevel,
        now: TimePointSec,
    ) -> Result<bool, Error> {
        let mut sessions = self.sessions.lock().await;

        match sessions.iter_mut().find(|s| s.is_for(chain_id, signer)) {
            Some(s) => s.last_used = now,
            None => return Ok(false),
        }

        self.persist(&sessions).await?;
        Ok(true)
    }

    pub async fn list(&self) -> Vec<Session> {
        self.sessions.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn find_by_chain(&self, chain_id: &ChainId) -> Vec<Session> {
        self.filter(|s| &s.chain_id == chain_id).await
    }

    pub async fn find_by_actor(&self, actor: Name) -> Vec<Session> {
        self.filter(|s| s.actor == actor).await
    }

    /// Find the most recently used session for an application key on `chain_id`
    pub async fn find_by_key(&self, chain_id: &ChainId, key: &PublicKey) -> Option<Session> {
        self.filter(|s| &s.chain_id == chain_id && &s.public_key == key)
            .await
            .into_iter()
            .max_by_key(|s| s.last_used)
    }

    async fn filter(&self, f: impl Fn(&Session) -> bool) -> Vec<Session> {
        self.sessions
            .lock()
            .await
            .iter()
            .filter(|s| f(s))
            .cloned()
            .collect()
    }

    async fn persist(&self, sessions: &[Session]) -> Result<(), Error> {
        let s = serde_json::to_string(sessions)?;
        self.store.set(SESSIONS_KEY, &s).await
    }
}

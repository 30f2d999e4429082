//! Session Store
//!
//! In-memory registry of sessions keyed by login. Readers always get cloned
//! snapshots; the only mutation is a whole-session upsert.

use super::types::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage seam for sessions. Injected into the services as `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or fully replace the session for `session.login`.
    /// Returns the session it replaced, if any.
    async fn upsert(&self, session: Session) -> Option<Session>;

    /// Snapshot of one session.
    async fn get(&self, login: &str) -> Option<Session>;

    /// Snapshot of every session, ordered by login.
    async fn list_all(&self) -> Vec<Session>;

    async fn count(&self) -> usize;
}

/// Process-local store. Sessions never expire and are lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn upsert(&self, session: Session) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.login.clone(), session)
    }

    async fn get(&self, login: &str) -> Option<Session> {
        self.sessions.read().await.get(login).cloned()
    }

    async fn list_all(&self) -> Vec<Session> {
        let mut all: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.login.cmp(&b.login));
        all
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

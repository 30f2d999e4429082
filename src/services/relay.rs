//! Relay Engine
//!
//! For one session: read pending messages from the marketplace and push each
//! one to the session's chat.
//!
//! Fetch errors are returned to the caller. Push errors are not: each failed
//! push is logged with the session, message id and cause, counted in the
//! report, and the remaining messages are still attempted.

use crate::error::{RelayError, Result};
use crate::remote::{MessageSource, PushSink, RemoteMessage};
use crate::services::template::PushTemplate;
use crate::session::{PushTarget, Session, SessionStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_PUSH_CONCURRENCY: usize = 4;

/// Outcome of one relay pass for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayReport {
    pub login: String,
    /// Well-formed messages returned by the marketplace.
    pub fetched: usize,
    /// Push attempts dispatched.
    pub attempted: usize,
    /// Pushes the sink accepted.
    pub pushed: usize,
    pub failed: usize,
    /// Messages suppressed because they were already delivered (dedup only).
    pub skipped: usize,
}

pub struct RelayEngine {
    store: Arc<dyn SessionStore>,
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn PushSink>,
    template: PushTemplate,
    push_concurrency: usize,
    seen: Option<SeenLedger>,
}

impl RelayEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn PushSink>,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            template: PushTemplate::default(),
            push_concurrency: DEFAULT_PUSH_CONCURRENCY,
            seen: None,
        }
    }

    pub fn with_template(mut self, template: PushTemplate) -> Self {
        self.template = template;
        self
    }

    /// Maximum pushes in flight for one relay pass. Clamped to at least 1.
    pub fn with_push_concurrency(mut self, limit: usize) -> Self {
        self.push_concurrency = limit.max(1);
        self
    }

    /// Remember delivered message ids per login and skip them on later passes.
    /// Off by default: every pass re-pushes everything the marketplace returns.
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.seen = enabled.then(SeenLedger::default);
        self
    }

    pub fn dedup_enabled(&self) -> bool {
        self.seen.is_some()
    }

    async fn session(&self, login: &str) -> Result<Session> {
        self.store
            .get(login)
            .await
            .ok_or_else(|| RelayError::SessionNotFound(login.to_string()))
    }

    /// Read the messages currently pending for `login` without pushing them.
    pub async fn fetch_pending(&self, login: &str) -> Result<Vec<RemoteMessage>> {
        let session = self.session(login).await?;
        self.source.fetch_messages(&session.remote_token).await
    }

    /// Fetch pending messages for `login` and push each one to its chat.
    pub async fn relay_once(&self, login: &str) -> Result<RelayReport> {
        let session = self.session(login).await?;
        let messages = self.source.fetch_messages(&session.remote_token).await?;

        let fetched = messages.len();
        let pending = match &self.seen {
            Some(seen) => seen.unseen(&session.login, messages),
            None => messages,
        };

        let mut report = RelayReport {
            login: session.login.clone(),
            fetched,
            attempted: pending.len(),
            skipped: fetched - pending.len(),
            ..Default::default()
        };

        let target = session.push_target;
        let outcomes: Vec<(Option<String>, bool)> = stream::iter(pending)
            .map(|message| self.push_one(&session.login, target, message))
            .buffered(self.push_concurrency)
            .collect()
            .await;

        for (id, delivered) in outcomes {
            if delivered {
                report.pushed += 1;
                if let (Some(seen), Some(id)) = (&self.seen, id) {
                    seen.mark(&session.login, id);
                }
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            login = %report.login,
            fetched = report.fetched,
            pushed = report.pushed,
            failed = report.failed,
            skipped = report.skipped,
            "Relay pass complete"
        );
        Ok(report)
    }

    async fn push_one(
        &self,
        login: &str,
        target: PushTarget,
        message: RemoteMessage,
    ) -> (Option<String>, bool) {
        let body = self.template.render(&message);
        match self.sink.push(target, &body).await {
            Ok(()) => (message.id, true),
            Err(e) => {
                tracing::warn!(
                    login = %login,
                    message_id = message.id.as_deref().unwrap_or("-"),
                    chat_id = target.id(),
                    error = %e,
                    "Push delivery failed, continuing with remaining messages"
                );
                (message.id, false)
            }
        }
    }
}

// ─── Dedup Ledger ────────────────────────────────────────────

/// Delivered message ids per login. Grows without bound, like the session store.
#[derive(Debug, Default)]
struct SeenLedger {
    ids: Mutex<HashMap<String, HashSet<String>>>,
}

impl SeenLedger {
    fn unseen(&self, login: &str, messages: Vec<RemoteMessage>) -> Vec<RemoteMessage> {
        let ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(seen) = ids.get(login) else {
            return messages;
        };
        messages
            .into_iter()
            .filter(|m| m.id.as_ref().is_none_or(|id| !seen.contains(id)))
            .collect()
    }

    fn mark(&self, login: &str, id: String) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.entry(login.to_string()).or_default().insert(id);
    }
}

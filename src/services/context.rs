//! Service Context
//!
//! Wires the session store, remote clients, relay engine and scheduler
//! together, either from settings or from injected parts.

use crate::config::{SchedulerSettings, Settings};
use crate::remote::{HttpMessageSource, MessageSource, PushSink, TelegramPushSink, build_http_client};
use crate::services::relay::RelayEngine;
use crate::services::scheduler::PollScheduler;
use crate::services::session::SessionService;
use crate::services::template::PushTemplate;
use crate::session::{InMemorySessionStore, SessionStore};
use anyhow::Context;
use std::sync::Arc;

/// Handles shared by the gateway and the scheduler. Cheap to clone.
#[derive(Clone)]
pub struct ServiceContext {
    pub sessions: SessionService,
    pub relay: Arc<RelayEngine>,
    store: Arc<dyn SessionStore>,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn SessionStore>,
        source: Arc<dyn MessageSource>,
        relay: RelayEngine,
    ) -> Self {
        Self {
            sessions: SessionService::new(store.clone(), source),
            relay: Arc::new(relay),
            store,
        }
    }

    /// Build a context with a default relay engine over the given parts.
    pub fn from_parts(
        store: Arc<dyn SessionStore>,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn PushSink>,
    ) -> Self {
        let relay = RelayEngine::new(store.clone(), source.clone(), sink);
        Self::new(store, source, relay)
    }

    /// Build the production context: in-memory store, HTTP marketplace
    /// source and Telegram sink sharing one timeout-bounded client.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client =
            build_http_client(settings.http.timeout()).context("Failed to build HTTP client")?;

        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let source: Arc<dyn MessageSource> = Arc::new(HttpMessageSource::new(
            client.clone(),
            &settings.source.base_url,
            &settings.source.messages_path,
        ));
        let sink: Arc<dyn PushSink> = Arc::new(TelegramPushSink::new(
            client,
            &settings.push.api_base,
            settings.push.bot_token.clone(),
        ));

        let template =
            PushTemplate::new(settings.push.template.clone()).context("Invalid push.template")?;
        let relay = RelayEngine::new(store.clone(), source.clone(), sink)
            .with_template(template)
            .with_push_concurrency(settings.relay.push_concurrency)
            .with_dedup(settings.relay.dedup);

        Ok(Self::new(store, source, relay))
    }

    /// A poll scheduler over this context's store and engine.
    pub fn scheduler(&self, settings: &SchedulerSettings) -> PollScheduler {
        PollScheduler::new(self.store.clone(), self.relay.clone())
            .with_period(settings.poll_period())
            .with_max_concurrent_sessions(settings.max_concurrent_sessions)
    }
}

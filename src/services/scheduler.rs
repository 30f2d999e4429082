//! Poll Scheduler
//!
//! Background loop that runs a relay pass for every registered session, then
//! waits one poll period and repeats.
//!
//! ```text
//! spawn ──► [cycle: snapshot sessions → relay each in its own task] ──► sleep(period) ─┐
//!             ▲                                                                         │
//!             └─────────────────────────────────────────────────────────────────────────┘
//!           cancel token fired → loop exits after the current cycle
//! ```
//!
//! A session whose relay errors or panics is logged and skipped. It never
//! delays or aborts the other sessions in the cycle, and never ends the loop.

use crate::services::relay::RelayEngine;
use crate::session::SessionStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 16;

/// Summary of one pass over all sessions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub sessions: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pushed: usize,
}

#[derive(Clone)]
pub struct PollScheduler {
    store: Arc<dyn SessionStore>,
    engine: Arc<RelayEngine>,
    period: Duration,
    max_concurrent_sessions: usize,
}

impl PollScheduler {
    pub fn new(store: Arc<dyn SessionStore>, engine: Arc<RelayEngine>) -> Self {
        Self {
            store,
            engine,
            period: DEFAULT_POLL_PERIOD,
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Maximum sessions relayed at once within a cycle. Clamped to at least 1.
    pub fn with_max_concurrent_sessions(mut self, limit: usize) -> Self {
        self.max_concurrent_sessions = limit.max(1);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one relay pass over a snapshot of all sessions.
    pub async fn run_cycle(&self) -> CycleReport {
        let sessions = self.store.list_all().await;
        let mut report = CycleReport {
            cycle_id: Uuid::new_v4(),
            sessions: sessions.len(),
            ..Default::default()
        };

        let permits = Arc::new(Semaphore::new(self.max_concurrent_sessions));
        let mut tasks = JoinSet::new();
        for session in sessions {
            let engine = self.engine.clone();
            let permits = permits.clone();
            let login = session.login;
            tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails if it were.
                let _permit = permits.acquire_owned().await.ok();
                let result = engine.relay_once(&login).await;
                (login, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(relay))) => {
                    report.succeeded += 1;
                    report.pushed += relay.pushed;
                }
                Ok((login, Err(e))) => {
                    report.failed += 1;
                    tracing::warn!(
                        cycle_id = %report.cycle_id,
                        login = %login,
                        error_kind = e.kind(),
                        error = %e,
                        "Scheduled relay failed, continuing with other sessions"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        cycle_id = %report.cycle_id,
                        error = %e,
                        "Scheduled relay task aborted"
                    );
                }
            }
        }

        tracing::debug!(
            cycle_id = %report.cycle_id,
            sessions = report.sessions,
            succeeded = report.succeeded,
            failed = report.failed,
            pushed = report.pushed,
            "Poll cycle finished"
        );
        report
    }

    /// Start the loop with a fresh cancellation token.
    pub fn spawn(self) -> SchedulerHandle {
        self.spawn_with_token(CancellationToken::new())
    }

    /// Start the loop, stopping when `cancel` fires.
    /// A cycle in progress is allowed to finish; every network call it makes
    /// is bounded by the HTTP client timeout.
    pub fn spawn_with_token(self, cancel: CancellationToken) -> SchedulerHandle {
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            tracing::info!(period_secs = self.period.as_secs_f64(), "Poll scheduler started");
            loop {
                if token.is_cancelled() {
                    break;
                }
                self.run_cycle().await;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(self.period) => {}
                }
            }
            tracing::info!("Poll scheduler stopped");
        });
        SchedulerHandle { cancel, join }
    }
}

/// Lifecycle handle for a spawned scheduler loop.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Poll scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::remote::sink::MockPushSink;
    use crate::remote::{MessageSource, RemoteMessage};
    use crate::remote::source::MockMessageSource;
    use crate::session::{InMemorySessionStore, PushTarget, Secret, Session};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    async fn store_with(logins: &[(&str, i64)]) -> Arc<InMemorySessionStore> {
        let store = Arc::new(InMemorySessionStore::new());
        for (login, chat_id) in logins {
            store
                .upsert(Session::new(
                    *login,
                    Secret::new("pw"),
                    Secret::new(format!("token-{login}")),
                    PushTarget::new(*chat_id).expect("target"),
                ))
                .await;
        }
        store
    }

    fn scheduler(
        store: Arc<InMemorySessionStore>,
        source: MockMessageSource,
        sink: MockPushSink,
    ) -> PollScheduler {
        let engine = RelayEngine::new(store.clone(), Arc::new(source), Arc::new(sink));
        PollScheduler::new(store, Arc::new(engine))
    }

    #[tokio::test]
    async fn test_failing_session_does_not_block_others() {
        let store = store_with(&[("alice", 1), ("bob", 2), ("carl", 3)]).await;

        let mut source = MockMessageSource::new();
        source.expect_fetch_messages().returning(|token| {
            if token.expose() == "token-alice" {
                Err(RelayError::UpstreamFetch {
                    status: Some(503),
                    reason: "Service Unavailable".to_string(),
                })
            } else {
                Ok(vec![RemoteMessage::new("1", "seller", "is it available?")])
            }
        });

        let pushed_to: Arc<Mutex<Vec<i64>>> = Arc::default();
        let recorded = pushed_to.clone();
        let mut sink = MockPushSink::new();
        sink.expect_push().times(2).returning(move |target, _| {
            recorded.lock().expect("lock").push(target.id());
            Ok(())
        });

        let report = scheduler(store, source, sink).run_cycle().await;
        assert_eq!(report.sessions, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pushed, 2);

        let mut targets = pushed_to.lock().expect("lock").clone();
        targets.sort();
        assert_eq!(targets, vec![2, 3]);
    }

    /// Panics while fetching for alice; a mock would poison its own state
    /// and fail every other session's call as well.
    struct PanicsForAlice;

    #[async_trait::async_trait]
    impl MessageSource for PanicsForAlice {
        async fn authenticate(
            &self,
            login: &str,
            _credential_secret: &Secret,
        ) -> crate::error::Result<Secret> {
            Ok(Secret::new(format!("token-{login}")))
        }

        #[allow(clippy::panic)]
        async fn fetch_messages(&self, token: &Secret) -> crate::error::Result<Vec<RemoteMessage>> {
            if token.expose() == "token-alice" {
                panic!("marketplace client bug");
            }
            Ok(vec![RemoteMessage::new("1", "seller", "still available?")])
        }
    }

    #[tokio::test]
    async fn test_panicking_session_does_not_block_others() {
        let store = store_with(&[("alice", 1), ("bob", 2)]).await;

        let mut sink = MockPushSink::new();
        sink.expect_push()
            .times(1)
            .withf(|target, _| target.id() == 2)
            .returning(|_, _| Ok(()));

        let engine = RelayEngine::new(store.clone(), Arc::new(PanicsForAlice), Arc::new(sink));
        let report = PollScheduler::new(store, Arc::new(engine)).run_cycle().await;

        assert_eq!(report.sessions, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pushed, 1);
    }

    #[tokio::test]
    async fn test_push_failures_do_not_fail_the_session() {
        let store = store_with(&[("alice", 1)]).await;

        let mut source = MockMessageSource::new();
        source
            .expect_fetch_messages()
            .returning(|_| Ok(vec![RemoteMessage::new("1", "bob", "hi")]));
        let mut sink = MockPushSink::new();
        sink.expect_push().returning(|target, _| {
            Err(RelayError::PushDelivery {
                target: target.id(),
                status: Some(429),
                reason: "Too Many Requests".to_string(),
            })
        });

        let report = scheduler(store, source, sink).run_cycle().await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.pushed, 0);
    }

    #[tokio::test]
    async fn test_empty_store_cycle() {
        let mut source = MockMessageSource::new();
        source.expect_fetch_messages().times(0);
        let mut sink = MockPushSink::new();
        sink.expect_push().times(0);

        let report = scheduler(store_with(&[]).await, source, sink).run_cycle().await;
        assert_eq!(report.sessions, 0);
        assert_eq!(report.succeeded + report.failed, 0);
    }

    #[tokio::test]
    async fn test_spawned_loop_repeats_and_shuts_down() {
        let store = store_with(&[("alice", 555)]).await;

        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let mut source = MockMessageSource::new();
        source.expect_fetch_messages().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });
        let mut sink = MockPushSink::new();
        sink.expect_push().times(0);

        let handle = scheduler(store, source, sink)
            .with_period(Duration::from_millis(10))
            .spawn();
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.shutdown().await;

        let after_shutdown = fetches.load(Ordering::SeqCst);
        assert!(after_shutdown >= 2, "expected repeated cycles, got {after_shutdown}");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), after_shutdown);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_runs_no_cycle() {
        let mut source = MockMessageSource::new();
        source.expect_fetch_messages().times(0);
        let mut sink = MockPushSink::new();
        sink.expect_push().times(0);

        let token = CancellationToken::new();
        token.cancel();
        let handle = scheduler(store_with(&[("alice", 1)]).await, source, sink)
            .spawn_with_token(token);
        handle.shutdown().await;
    }
}

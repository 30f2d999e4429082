//! Session Service
//!
//! Registration, lookup and listing of sessions. The only writer to the
//! session store.

use crate::error::{RelayError, Result};
use crate::remote::MessageSource;
use crate::session::{PushTarget, Secret, Session, SessionStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    source: Arc<dyn MessageSource>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, source: Arc<dyn MessageSource>) -> Self {
        Self { store, source }
    }

    /// Register (or re-register) `login`. Input is validated before any
    /// remote call; an existing session is fully replaced.
    pub async fn register(
        &self,
        login: &str,
        credential_secret: &str,
        push_target: Option<PushTarget>,
    ) -> Result<Session> {
        let login = login.trim();
        if login.is_empty() {
            return Err(RelayError::Validation("login must not be empty".to_string()));
        }
        let push_target = push_target
            .ok_or_else(|| RelayError::Validation("push target is required".to_string()))?;

        let credential_secret = Secret::new(credential_secret);
        let remote_token = self.source.authenticate(login, &credential_secret).await?;

        let session = Session::new(login, credential_secret, remote_token, push_target);
        let replaced = self.store.upsert(session.clone()).await;

        tracing::info!(
            login = %session.login,
            chat_id = session.push_target.id(),
            replaced = replaced.is_some(),
            "Session registered"
        );
        Ok(session)
    }

    pub async fn get(&self, login: &str) -> Result<Session> {
        self.store
            .get(login)
            .await
            .ok_or_else(|| RelayError::SessionNotFound(login.to_string()))
    }

    pub async fn list_all(&self) -> Vec<Session> {
        self.store.list_all().await
    }

    pub async fn count(&self) -> usize {
        self.store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::source::MockMessageSource;
    use crate::session::InMemorySessionStore;

    fn stub_source() -> MockMessageSource {
        let mut source = MockMessageSource::new();
        source
            .expect_authenticate()
            .returning(|login, _| Ok(Secret::new(format!("token-{login}"))));
        source
    }

    fn service(source: MockMessageSource) -> SessionService {
        SessionService::new(Arc::new(InMemorySessionStore::new()), Arc::new(source))
    }

    fn target(id: i64) -> Option<PushTarget> {
        Some(PushTarget::new(id).expect("target"))
    }

    #[tokio::test]
    async fn test_register_then_get() {
        let svc = service(stub_source());
        let session = svc.register("alice", "pw", target(555)).await.expect("registered");
        assert_eq!(session.remote_token.expose(), "token-alice");

        let found = svc.get("alice").await.expect("found");
        assert_eq!(found.push_target.id(), 555);
        assert_eq!(found.credential_secret.expose(), "pw");
    }

    #[tokio::test]
    async fn test_reregister_is_last_write_wins() {
        let svc = service(stub_source());
        svc.register("alice", "pw1", target(555)).await.expect("first");
        svc.register("bob", "pw", target(1)).await.expect("bob");
        svc.register("alice", "pw2", target(777)).await.expect("second");

        assert_eq!(svc.list_all().await.len(), 2);
        let alice = svc.get("alice").await.expect("alice");
        assert_eq!(alice.push_target.id(), 777);
        assert_eq!(alice.credential_secret.expose(), "pw2");
    }

    #[tokio::test]
    async fn test_missing_push_target_rejected_without_auth_call() {
        let mut source = MockMessageSource::new();
        source.expect_authenticate().times(0);
        let svc = service(source);

        let err = svc.register("alice", "pw", None).await.expect_err("no target");
        assert!(matches!(err, RelayError::Validation(_)));
        assert_eq!(svc.count().await, 0);
    }

    #[tokio::test]
    async fn test_blank_login_rejected() {
        let mut source = MockMessageSource::new();
        source.expect_authenticate().times(0);
        let svc = service(source);

        let err = svc.register("   ", "pw", target(555)).await.expect_err("blank");
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authentication_failure_stores_nothing() {
        let mut source = MockMessageSource::new();
        source
            .expect_authenticate()
            .returning(|_, _| Err(RelayError::Authentication("rejected".to_string())));
        let svc = service(source);

        let err = svc.register("alice", "pw", target(555)).await.expect_err("auth");
        assert!(matches!(err, RelayError::Authentication(_)));
        assert!(matches!(
            svc.get("alice").await,
            Err(RelayError::SessionNotFound(_))
        ));
    }
}

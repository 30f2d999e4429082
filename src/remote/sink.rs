//! Telegram Push Sink
//!
//! Delivers a text to a chat via the Bot API `sendMessage` endpoint:
//! `POST {api_base}/bot<token>/sendMessage` with `{"chat_id", "text"}`.
//! Plain text only, so no MarkdownV2 escaping is needed.

use crate::error::{RelayError, Result};
use crate::session::{PushTarget, Secret};
use crate::utils::truncate_str;
use async_trait::async_trait;

/// Longest response body kept in a delivery error.
const ERROR_BODY_LIMIT: usize = 200;

/// The messaging platform the relay pushes to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSink: Send + Sync {
    /// Send `text` to `target`. Any 2xx response counts as delivered.
    async fn push(&self, target: PushTarget, text: &str) -> Result<()>;
}

pub struct TelegramPushSink {
    client: reqwest::Client,
    api_base: String,
    bot_token: Secret,
}

impl TelegramPushSink {
    pub fn new(client: reqwest::Client, api_base: &str, bot_token: Secret) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token.expose())
    }
}

#[async_trait]
impl PushSink for TelegramPushSink {
    async fn push(&self, target: PushTarget, text: &str) -> Result<()> {
        if self.bot_token.is_empty() {
            return Err(RelayError::PushDelivery {
                target: target.id(),
                status: None,
                reason: "Telegram bot token not configured".to_string(),
            });
        }

        let body = serde_json::json!({
            "chat_id": target.id(),
            "text": text,
        });

        // Errors are stripped of their URL: it embeds the bot token.
        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::PushDelivery {
                target: target.id(),
                status: None,
                reason: e.without_url().to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::PushDelivery {
                target: target.id(),
                status: Some(status),
                reason: format!(
                    "Telegram returned HTTP {}: {}",
                    status,
                    truncate_str(&body, ERROR_BODY_LIMIT)
                ),
            });
        }

        tracing::debug!(chat_id = target.id(), "Telegram push delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{build_http_client, silent_endpoint};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn sink_for(server: &Server, token: &str) -> TelegramPushSink {
        let client = build_http_client(Duration::from_secs(5)).expect("client");
        TelegramPushSink::new(client, &server.url(), Secret::new(token))
    }

    #[tokio::test]
    async fn test_push_posts_chat_id_and_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/botTEST-TOKEN/sendMessage")
            .match_body(Matcher::Json(json!({"chat_id": 555, "text": "New notification: hi"})))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        sink_for(&server, "TEST-TOKEN")
            .push(PushTarget::new(555).expect("target"), "New notification: hi")
            .await
            .expect("delivered");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_push_non_success_is_delivery_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/botTEST-TOKEN/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#)
            .create_async()
            .await;

        let err = sink_for(&server, "TEST-TOKEN")
            .push(PushTarget::new(555).expect("target"), "hi")
            .await
            .expect_err("403 must fail");

        match err {
            RelayError::PushDelivery { target, status, reason } => {
                assert_eq!(target, 555);
                assert_eq!(status, Some(403));
                assert!(reason.contains("blocked"));
                assert!(!reason.contains("TEST-TOKEN"));
            }
            other => unreachable!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_push_without_token_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = sink_for(&server, "")
            .push(PushTarget::new(555).expect("target"), "hi")
            .await
            .expect_err("no token");

        assert!(matches!(err, RelayError::PushDelivery { status: None, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_push_to_silent_api_times_out() {
        let (url, accept_task) = silent_endpoint().await;
        let client = build_http_client(Duration::from_secs(1)).expect("client");
        let sink = TelegramPushSink::new(client, &url, Secret::new("TEST-TOKEN"));

        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            sink.push(PushTarget::new(555).expect("target"), "hi"),
        )
        .await
        .expect("push must be bounded by the client timeout");
        accept_task.abort();

        match result {
            Err(RelayError::PushDelivery { status, reason, .. }) => {
                assert_eq!(status, None);
                assert!(!reason.contains("TEST-TOKEN"));
            }
            other => unreachable!("unexpected result: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

//! Marketplace Message Source
//!
//! Reads pending messages for a bearer token:
//! `GET {base_url}{messages_path}` → `{"messages": [{"id", "sender", "text"}]}`.
//!
//! There is no public token endpoint to call, so `authenticate` issues a local
//! stub token instead of making a request.

use super::RemoteMessage;
use crate::error::{RelayError, Result};
use crate::session::Secret;
use async_trait::async_trait;
use serde_json::Value;

/// The upstream API the relay reads messages from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Exchange a login and credential for a remote bearer token.
    async fn authenticate(&self, login: &str, credential_secret: &Secret) -> Result<Secret>;

    /// Read the messages currently visible to `token`.
    async fn fetch_messages(&self, token: &Secret) -> Result<Vec<RemoteMessage>>;
}

/// `reqwest`-backed message source.
pub struct HttpMessageSource {
    client: reqwest::Client,
    messages_url: String,
}

impl HttpMessageSource {
    pub fn new(client: reqwest::Client, base_url: &str, messages_path: &str) -> Self {
        Self {
            client,
            messages_url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                messages_path.trim_start_matches('/')
            ),
        }
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl MessageSource for HttpMessageSource {
    async fn authenticate(&self, login: &str, _credential_secret: &Secret) -> Result<Secret> {
        tracing::debug!(login = %login, "Issuing stub marketplace token");
        Ok(Secret::new(format!("stub-token:{login}")))
    }

    async fn fetch_messages(&self, token: &Secret) -> Result<Vec<RemoteMessage>> {
        let response = self
            .client
            .get(&self.messages_url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(RelayError::fetch_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamFetch {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("non-success status")
                    .to_string(),
            });
        }

        let body: Value = response.json().await.map_err(|e| RelayError::UpstreamFetch {
            status: Some(status.as_u16()),
            reason: format!("invalid message payload: {}", e.without_url()),
        })?;

        Ok(parse_messages(&body))
    }
}

/// Extract well-formed messages. A missing or `null` list is treated as empty.
fn parse_messages(body: &Value) -> Vec<RemoteMessage> {
    let Some(items) = body.get("messages").and_then(Value::as_array) else {
        if body.get("messages").is_some_and(|m| !m.is_null()) {
            tracing::warn!("Upstream 'messages' field is not a list, treating as empty");
        }
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let msg = RemoteMessage::from_value(item);
            if msg.is_none() {
                tracing::warn!(index, "Skipping malformed upstream message");
            }
            msg
        })
        .collect()
}

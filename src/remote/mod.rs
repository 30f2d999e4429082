//! Remote Collaborators
//!
//! Clients for the two external systems the relay talks to:
//! - the marketplace message source (`source`)
//! - the Telegram push sink (`sink`)
//!
//! Both sit behind traits so the relay engine can be driven by test doubles.

pub mod sink;
pub mod source;

pub use sink::{PushSink, TelegramPushSink};
pub use source::{HttpMessageSource, MessageSource};

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// A single message read from the marketplace for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteMessage {
    pub id: Option<String>,
    pub sender: Option<String>,
    pub text: String,
}

impl RemoteMessage {
    pub fn new(id: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            sender: Some(sender.into()),
            text: text.into(),
        }
    }

    /// Build a message from one item of the upstream `messages` array.
    /// Returns `None` unless the item is an object with a string `text`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = obj.get("text")?.as_str()?.to_string();
        Some(Self {
            id: obj.get("id").and_then(scalar_to_string),
            sender: obj.get("sender").and_then(scalar_to_string),
            text,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build the shared HTTP client. Every request carries `timeout`.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(format!("olx-relay/{}", crate::VERSION))
        .build()
}

/// A TCP endpoint that accepts connections and never answers. Returns its
/// base URL and the accept task, which holds every socket open until aborted.
#[cfg(test)]
pub(crate) async fn silent_endpoint() -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind silent endpoint");
    let addr = listener.local_addr().expect("local addr");
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (format!("http://{addr}"), task)
}

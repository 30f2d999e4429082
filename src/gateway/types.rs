//! Gateway request and response bodies.

use crate::remote::RemoteMessage;
use crate::services::RelayReport;
use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `POST /login` body. `chat_id` stays raw JSON so absent and malformed ids
/// are reported as validation errors rather than body rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub chat_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub login: String,
}

/// `?login=` query for the per-session endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginQuery {
    pub login: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub message_id: Option<String>,
    pub sender: Option<String>,
    pub text: String,
}

impl From<RemoteMessage> for Notification {
    fn from(msg: RemoteMessage) -> Self {
        Self {
            message_id: msg.id,
            sender: msg.sender,
            text: msg.text,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendNotificationResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: RelayReport,
}

/// Session listing entry. Credentials and tokens are never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub login: String,
    pub chat_id: i64,
    pub registered_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            login: session.login.clone(),
            chat_id: session.push_target.id(),
            registered_at: session.registered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

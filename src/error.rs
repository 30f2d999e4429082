//! Relay Error Types
//!
//! One error enum shared by the session service, the relay engine and the
//! remote collaborators. The gateway maps each variant to an HTTP status.

use thiserror::Error;

/// Result alias used across the relay core.
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed registration input. Surfaced to the caller, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No session is registered under this login.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The marketplace API refused or failed the message read.
    #[error("Upstream fetch failed{}: {reason}", status_suffix(.status))]
    UpstreamFetch { status: Option<u16>, reason: String },

    /// Obtaining a remote token during registration failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A single push to the messaging platform failed.
    #[error("Push to {target} failed{}: {reason}", status_suffix(.status))]
    PushDelivery {
        target: i64,
        status: Option<u16>,
        reason: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl RelayError {
    /// Short machine-readable kind, used in gateway error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::SessionNotFound(_) => "session_not_found",
            Self::UpstreamFetch { .. } => "upstream_fetch_error",
            Self::Authentication(_) => "authentication_error",
            Self::PushDelivery { .. } => "push_delivery_error",
        }
    }

    pub(crate) fn fetch_transport(err: reqwest::Error) -> Self {
        Self::UpstreamFetch {
            status: err.status().map(|s| s.as_u16()),
            reason: err.without_url().to_string(),
        }
    }
}

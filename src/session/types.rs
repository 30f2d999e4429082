//! Session Types
//!
//! The per-user bridge state, the chat id it is bound to, and the secret
//! wrapper that keeps credentials out of logs and debug output.

use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***";

// ─── Secret ──────────────────────────────────────────────────

/// An opaque credential. Zeroed on drop; `Debug` and `Serialize` are redacted.
#[derive(Clone, Default)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the raw value. Only call this at the point the secret is sent.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret::new)
    }
}

// ─── Push Target ─────────────────────────────────────────────

/// A Telegram chat id. Never zero; negative ids address groups and channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PushTarget(i64);

impl PushTarget {
    pub fn new(id: i64) -> Result<Self> {
        if id == 0 {
            return Err(RelayError::Validation(
                "malformed push target: chat id must be non-zero".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Parse a chat id from request JSON. Accepts integers and numeric strings.
    pub fn from_json(value: Option<&serde_json::Value>) -> Result<Self> {
        let malformed = || RelayError::Validation("malformed push target".to_string());
        match value {
            None | Some(serde_json::Value::Null) => Err(RelayError::Validation(
                "push target is required".to_string(),
            )),
            Some(serde_json::Value::Number(n)) => Self::new(n.as_i64().ok_or_else(malformed)?),
            Some(serde_json::Value::String(s)) => {
                Self::new(s.trim().parse::<i64>().map_err(|_| malformed())?)
            }
            Some(_) => Err(malformed()),
        }
    }

    pub fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PushTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Session ─────────────────────────────────────────────────

/// One registered user's bridge state.
#[derive(Debug, Clone)]
pub struct Session {
    pub login: String,
    pub credential_secret: Secret,
    pub remote_token: Secret,
    pub push_target: PushTarget,
    pub registered_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        login: impl Into<String>,
        credential_secret: Secret,
        remote_token: Secret,
        push_target: PushTarget,
    ) -> Self {
        Self {
            login: login.into(),
            credential_secret,
            remote_token,
            push_target,
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "***");
        assert_eq!(
            serde_json::to_string(&secret).expect("serialize"),
            "\"***\""
        );
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_session_debug_hides_credentials() {
        let session = Session::new(
            "alice",
            Secret::new("pa55word"),
            Secret::new("tok-123"),
            PushTarget::new(555).expect("target"),
        );
        let debug = format!("{:?}", session);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("pa55word"));
        assert!(!debug.contains("tok-123"));
    }

    #[rstest]
    #[case(json!(555), 555)]
    #[case(json!(-100123), -100123)]
    #[case(json!("555"), 555)]
    #[case(json!(" 42 "), 42)]
    fn test_push_target_accepts(#[case] value: serde_json::Value, #[case] expected: i64) {
        let target = PushTarget::from_json(Some(&value)).expect("valid target");
        assert_eq!(target.id(), expected);
    }

    #[rstest]
    #[case(json!(0))]
    #[case(json!(1.5))]
    #[case(json!("abc"))]
    #[case(json!(true))]
    #[case(json!([555]))]
    #[case(json!({"id": 555}))]
    fn test_push_target_rejects_malformed(#[case] value: serde_json::Value) {
        let err = PushTarget::from_json(Some(&value)).expect_err("malformed");
        assert!(matches!(err, RelayError::Validation(ref m) if m.starts_with("malformed")));
    }

    #[test]
    fn test_push_target_absent() {
        for value in [None, Some(&serde_json::Value::Null)] {
            let err = PushTarget::from_json(value).expect_err("absent");
            assert!(matches!(err, RelayError::Validation(ref m) if m == "push target is required"));
        }
    }
}

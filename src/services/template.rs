//! Push Body Template
//!
//! Renders the chat text for a relayed message. Placeholders: `{text}`,
//! `{sender}`, `{id}`. Substitution is single-pass, so placeholder-looking
//! text inside a message body is left alone.

use crate::error::{RelayError, Result};
use crate::remote::RemoteMessage;
use crate::utils::truncate_utf16;

/// Telegram rejects `sendMessage` texts longer than this many UTF-16 code units.
pub const TELEGRAM_TEXT_LIMIT: usize = 4096;

pub const DEFAULT_TEMPLATE: &str = "New notification: {text}";

#[derive(Debug, Clone)]
pub struct PushTemplate {
    pattern: String,
}

impl PushTemplate {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{text}") {
            return Err(RelayError::Validation(
                "push template must contain the {text} placeholder".to_string(),
            ));
        }
        Ok(Self { pattern })
    }

    pub fn render(&self, message: &RemoteMessage) -> String {
        let mut out = String::with_capacity(self.pattern.len() + message.text.len());
        let mut rest = self.pattern.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let (value, consumed) = if tail.starts_with("{text}") {
                (message.text.as_str(), "{text}".len())
            } else if tail.starts_with("{sender}") {
                (message.sender.as_deref().unwrap_or("unknown"), "{sender}".len())
            } else if tail.starts_with("{id}") {
                (message.id.as_deref().unwrap_or(""), "{id}".len())
            } else {
                ("{", 1)
            };
            out.push_str(value);
            rest = &tail[consumed..];
        }
        out.push_str(rest);

        truncate_utf16(&out, TELEGRAM_TEXT_LIMIT).to_string()
    }
}

impl Default for PushTemplate {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

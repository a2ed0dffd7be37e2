//! Chat history entries and messages posted by ad iframes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the host application's chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an arbitrary role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Render history as `role: content` lines
pub fn format_conversation(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message posted by an ad iframe to its host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameMessage {
    /// The creative reports its rendered height in pixels
    AdHeight(f64),
}

impl FrameMessage {
    /// Interpret a posted payload, ignoring anything unrecognized
    ///
    /// `AD_HEIGHT` is only accepted with a numeric height greater than zero.
    pub fn parse(payload: &Value) -> Option<Self> {
        match payload.get("type").and_then(Value::as_str) {
            Some("AD_HEIGHT") => {
                let height = payload.get("height").and_then(Value::as_f64)?;
                (height.is_finite() && height > 0.0).then_some(Self::AdHeight(height))
            }
            _ => None,
        }
    }
}

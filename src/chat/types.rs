//! Chat request and response types.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolUsage;

/// One entry of the caller-supplied conversation history.
///
/// `content` is kept as raw JSON: assistant turns that carried tool calls
/// send `null`, and some clients send a list of content parts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryMessage {
    pub role: String,
    #[serde(default)]
    pub content: Value,
    /// Any other fields the caller attached (timestamps, ids, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Value::String(content.into()),
            extra: Map::new(),
        }
    }

    /// Content when it is a plain string.
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }

    /// Content as prompt text: strings verbatim, `null` as empty, anything
    /// else as compact JSON.
    pub fn display_content(&self) -> Cow<'_, str> {
        match &self.content {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, alias = "conversation_history")]
    pub conversation_history: Vec<HistoryMessage>,
    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_history: Vec::new(),
            session_id: None,
        }
    }
}

/// Reply to `POST /chat`. Degraded outcomes use the same shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response_text: String,
    pub session_id: String,
    pub user_message_count: usize,
    #[serde(default)]
    pub tool_usage: Option<ToolUsage>,
}

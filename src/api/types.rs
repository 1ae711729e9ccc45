//! Wire types of the chat service.
//!
//! Field names follow the service's JSON exactly; Rust-side names are only
//! changed where the wire name would be ambiguous.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Server-assigned message identifier.
///
/// The service currently uses integers, but the client treats the value as
/// opaque and sends it back in the same JSON form it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// One entry of the saved-conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(rename = "conversation_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ConversationSummary {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => "Untitled conversation",
        }
    }

    /// Last update time, if the service sent a parseable timestamp.
    ///
    /// Accepts RFC 3339 as well as naive ISO-8601 without an offset.
    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        let raw = self.updated_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    pub fn display_updated_at(&self) -> String {
        match self.updated_at() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
            None => self.updated_at.clone().unwrap_or_default(),
        }
    }
}

/// Author of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    #[serde(other)]
    Other,
}

/// A stored message as returned by the messages endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRecord {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub role: Role,
    pub content: String,
}

// =============================================================================
// Requests
// =============================================================================

/// Body of the chat endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
    pub role: Role,
    pub conversation_id: &'a str,
}

/// Reply of the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendMessageResponse {
    pub response: String,
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Reply of the clear endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClearConversationResponse {
    pub conversation_id: String,
}

/// Body of the feedback endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest<'a> {
    pub conversation_id: &'a str,
    pub message_id: &'a MessageId,
    pub is_positive: bool,
}

/// Body of the system-message endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SystemMessageRequest<'a> {
    pub conversation_id: &'a str,
    pub system_message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_id_keeps_its_wire_form() {
        let numeric: MessageId = serde_json::from_value(json!(42)).unwrap();
        let text: MessageId = serde_json::from_value(json!("m-7")).unwrap();
        assert_eq!(numeric, MessageId::Number(42));
        assert_eq!(text, MessageId::Text("m-7".into()));
        assert_eq!(serde_json::to_value(&numeric).unwrap(), json!(42));
        assert_eq!(numeric.to_string(), "42");
    }

    #[test]
    fn summary_reads_service_fields() {
        let summary: ConversationSummary = serde_json::from_value(json!({
            "id": 3,
            "conversation_id": "1714560000000",
            "title": "Hola que tal...",
            "created_at": "2024-05-01T10:00:00",
            "updated_at": "2024-05-01T12:30:15.123456"
        }))
        .unwrap();

        assert_eq!(summary.id, "1714560000000");
        assert_eq!(summary.display_title(), "Hola que tal...");
        assert_eq!(summary.display_updated_at(), "2024-05-01 12:30");
    }

    #[test]
    fn summary_tolerates_missing_title_and_odd_timestamps() {
        let summary: ConversationSummary = serde_json::from_value(json!({
            "conversation_id": "abc",
            "title": null,
            "updated_at": "yesterday"
        }))
        .unwrap();

        assert_eq!(summary.display_title(), "Untitled conversation");
        assert!(summary.updated_at().is_none());
        assert_eq!(summary.display_updated_at(), "yesterday");
    }

    #[test]
    fn unknown_roles_do_not_fail_decoding() {
        let record: MessageRecord =
            serde_json::from_value(json!({"id": 1, "role": "tool", "content": "x"})).unwrap();
        assert_eq!(record.role, Role::Other);
    }

    #[test]
    fn send_request_matches_service_body() {
        let body = SendMessageRequest {
            message: "hello",
            role: Role::User,
            conversation_id: "c1",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"message": "hello", "role": "user", "conversation_id": "c1"})
        );
    }
}

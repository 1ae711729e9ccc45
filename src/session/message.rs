//! Chat turns as the UI keeps them.

use serde::Serialize;

use crate::api::{MessageId, MessageRecord, Role};

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A rating given to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Self::Positive
        } else {
            Self::Negative
        }
    }
}

/// Delivery state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Shown before the service acknowledged it.
    Pending,
    Confirmed,
    /// The send failed; the turn can be retried.
    Failed,
}

/// One turn of the active conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Position-independent handle, unique within one chat shell.
    pub local_id: u64,
    pub sender: Sender,
    pub text: String,
    /// Server identifier. Absent until the service has persisted the turn.
    pub id: Option<MessageId>,
    pub feedback: Option<Feedback>,
    pub status: MessageStatus,
}

impl Message {
    pub fn pending_user(local_id: u64, text: impl Into<String>) -> Self {
        Self {
            local_id,
            sender: Sender::User,
            text: text.into(),
            id: None,
            feedback: None,
            status: MessageStatus::Pending,
        }
    }

    pub fn assistant(local_id: u64, text: impl Into<String>, id: Option<MessageId>) -> Self {
        Self {
            local_id,
            sender: Sender::Assistant,
            text: text.into(),
            id,
            feedback: None,
            status: MessageStatus::Confirmed,
        }
    }

    /// Convert a stored record. System records are not turns and yield `None`.
    pub fn from_record(local_id: u64, record: MessageRecord) -> Option<Self> {
        let sender = match record.role {
            Role::System => return None,
            Role::User => Sender::User,
            Role::Assistant | Role::Other => Sender::Assistant,
        };
        Some(Self {
            local_id,
            sender,
            text: record.content,
            id: record.id,
            feedback: None,
            status: MessageStatus::Confirmed,
        })
    }

    pub fn is_rated(&self) -> bool {
        self.feedback.is_some()
    }

    pub fn is_retryable(&self) -> bool {
        self.sender == Sender::User && self.status == MessageStatus::Failed
    }
}

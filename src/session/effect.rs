//! Effects produced by state transitions

use thiserror::Error;

use crate::api::MessageId;

/// A call against the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List saved conversations for one opening of the history panel
    FetchConversations { generation: u64 },

    /// Load the messages of a conversation
    FetchMessages { conversation_id: String },

    /// Submit a user message
    PostMessage {
        conversation_id: String,
        local_id: u64,
        text: String,
    },

    /// Retire a conversation server-side
    ClearConversation { conversation_id: String },

    /// Rate an assistant message
    PostFeedback {
        conversation_id: String,
        message_id: MessageId,
        positive: bool,
    },

    /// Replace the system prompt
    PostSystemPrompt {
        conversation_id: String,
        system_prompt: String,
    },

    /// Delete a saved conversation
    DeleteConversation { conversation_id: String },
}

impl Request {
    /// Whether the request belongs to the active conversation and must be
    /// cancelled once the user moves to another one.
    pub fn is_conversation_scoped(&self) -> bool {
        !matches!(
            self,
            Self::FetchConversations { .. } | Self::DeleteConversation { .. }
        )
    }
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue a request against the chat service
    Request(Request),

    /// Abort everything still in flight for a conversation
    CancelRequests { conversation_id: String },

    /// History selection, forwarded to the chat shell
    SelectConversation { conversation_id: String },

    /// A saved conversation is gone, the chat shell may need to move on
    ConversationRemoved { conversation_id: String },
}

impl Effect {
    pub fn request(request: Request) -> Self {
        Self::Request(request)
    }
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult<S> {
    pub new_state: S,
    pub effects: Vec<Effect>,
}

impl<S> TransitionResult<S> {
    pub fn new(state: S) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Reasons an event is rejected without touching state or the network
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A message is already being sent")]
    SendInFlight,
    #[error("No active conversation")]
    NoConversation,
    #[error("Conversation identifier is empty")]
    EmptyConversationId,
    #[error("Message {0} is not in the current conversation")]
    UnknownMessage(u64),
    #[error("Message {0} has not been saved by the service yet")]
    MessageNotPersisted(u64),
    #[error("Message {0} is already rated")]
    AlreadyRated(u64),
    #[error("Feedback for message {0} is already being sent")]
    FeedbackInFlight(u64),
    #[error("Message {0} cannot be retried")]
    NotRetryable(u64),
    #[error("No deletion awaiting confirmation")]
    NothingToConfirm,
    #[error("Completion for conversation {conversation_id} no longer applies")]
    Stale { conversation_id: String },
    #[error("Conversation list {0} was superseded by a later opening")]
    StaleList(u64),
}

impl TransitionError {
    pub(crate) fn stale(conversation_id: impl Into<String>) -> Self {
        Self::Stale {
            conversation_id: conversation_id.into(),
        }
    }

    /// Stale completions are routine after a conversation switch.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. } | Self::StaleList(_))
    }
}

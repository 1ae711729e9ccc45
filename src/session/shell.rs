//! Chat shell state and its pure transition function.
//!
//! The shell owns the active conversation: its identifier, the visible
//! turns, the input draft and the system prompt. Every user action and every
//! service completion is an [`ShellEvent`]; [`transition`] maps the current
//! state and one event to the next state plus the [`Effect`]s to run.
//!
//! Completions carry the conversation identifier that was active when the
//! request was issued. A completion whose identifier no longer matches is
//! rejected as stale, so a late reply can never land in another
//! conversation.

use serde::Serialize;

use crate::api::{
    ApiError, ClearConversationResponse, MessageId, MessageRecord, Role, SendMessageResponse,
};
use crate::config::DEFAULT_SYSTEM_PROMPT;

use super::effect::{Effect, Request, TransitionError, TransitionResult};
use super::message::{Feedback, Message, MessageStatus};

/// Live state of the active conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    /// Non-empty once the shell has mounted.
    pub conversation_id: String,
    pub messages: Vec<Message>,
    /// Text in the input box.
    pub draft: String,
    pub system_prompt: String,
    pub system_prompt_open: bool,
    /// A message send is outstanding.
    pub sending: bool,
    /// Conversation whose messages are being fetched.
    pub pending_load: Option<String>,
    /// Messages with a rating request in flight.
    pub pending_feedback: Vec<MessageId>,
    next_local_id: u64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl ConversationState {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            conversation_id: String::new(),
            messages: Vec::new(),
            draft: String::new(),
            system_prompt: system_prompt.into(),
            system_prompt_open: false,
            sending: false,
            pending_load: None,
            pending_feedback: Vec::new(),
            next_local_id: 1,
        }
    }

    /// Whether the typing indicator should show.
    pub fn is_loading(&self) -> bool {
        self.sending || self.pending_load.is_some()
    }

    /// Conversation to export, if any.
    pub fn export_target(&self) -> Option<&str> {
        Some(self.conversation_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn message(&self, local_id: u64) -> Option<&Message> {
        self.messages.iter().find(|m| m.local_id == local_id)
    }

    pub fn is_feedback_pending(&self, id: &MessageId) -> bool {
        self.pending_feedback.contains(id)
    }

    fn allocate_local_id(&mut self) -> u64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }

    /// Make `conversation_id` active with an empty transcript.
    ///
    /// Returns the effect cancelling the previous conversation's requests.
    fn switch_to(&mut self, conversation_id: String) -> Option<Effect> {
        let previous = std::mem::replace(&mut self.conversation_id, conversation_id);
        self.messages.clear();
        self.draft.clear();
        self.sending = false;
        self.pending_load = None;
        self.pending_feedback.clear();
        (!previous.is_empty()).then_some(Effect::CancelRequests {
            conversation_id: previous,
        })
    }

    fn ensure_active(&self, conversation_id: &str) -> Result<(), TransitionError> {
        if self.conversation_id == conversation_id {
            Ok(())
        } else {
            Err(TransitionError::stale(conversation_id))
        }
    }
}

/// Inputs of the chat shell.
#[derive(Debug)]
pub enum ShellEvent {
    /// First render. Adopts `fresh_id` unless an identifier already exists.
    Mount { fresh_id: String },
    EditDraft { text: String },
    LoadConversation { conversation_id: String },
    MessagesLoaded {
        conversation_id: String,
        result: Result<Vec<MessageRecord>, ApiError>,
    },
    SendMessage { text: String },
    RetryMessage { local_id: u64 },
    MessageSent {
        conversation_id: String,
        local_id: u64,
        result: Result<SendMessageResponse, ApiError>,
    },
    ClearConversation,
    ConversationCleared {
        conversation_id: String,
        result: Result<ClearConversationResponse, ApiError>,
    },
    StartNewConversation { fresh_id: String },
    SendFeedback { local_id: u64, positive: bool },
    FeedbackRecorded {
        conversation_id: String,
        message_id: MessageId,
        positive: bool,
        result: Result<(), ApiError>,
    },
    ToggleSystemPromptEditor,
    SaveSystemPrompt { text: String },
    SystemPromptSaved {
        conversation_id: String,
        result: Result<(), ApiError>,
    },
    /// A saved conversation was deleted from the history list.
    ConversationDeleted {
        conversation_id: String,
        fresh_id: String,
    },
}

/// Pure transition function of the chat shell.
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(
    state: &ConversationState,
    event: ShellEvent,
) -> Result<TransitionResult<ConversationState>, TransitionError> {
    let mut next = state.clone();

    match event {
        ShellEvent::Mount { fresh_id } => {
            if next.conversation_id.is_empty() {
                next.conversation_id = fresh_id;
            }
            Ok(TransitionResult::new(next))
        }

        ShellEvent::EditDraft { text } => {
            next.draft = text;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Loading a saved conversation
        // ============================================================
        ShellEvent::LoadConversation { conversation_id } => {
            if conversation_id.trim().is_empty() {
                return Err(TransitionError::EmptyConversationId);
            }
            next.pending_load = Some(conversation_id.clone());
            Ok(TransitionResult::new(next)
                .with_effect(Effect::request(Request::FetchMessages { conversation_id })))
        }

        ShellEvent::MessagesLoaded {
            conversation_id,
            result,
        } => {
            // Only the most recent load request is applied.
            if next.pending_load.as_deref() != Some(conversation_id.as_str()) {
                return Err(TransitionError::stale(conversation_id));
            }
            next.pending_load = None;

            let Ok(records) = result else {
                return Ok(TransitionResult::new(next));
            };

            let cancel = next.switch_to(conversation_id);
            for record in records {
                if record.role == Role::System {
                    next.system_prompt = record.content;
                    continue;
                }
                let local_id = next.allocate_local_id();
                next.messages.extend(Message::from_record(local_id, record));
            }
            Ok(TransitionResult::new(next).with_effects(cancel))
        }

        // ============================================================
        // Sending
        // ============================================================
        ShellEvent::SendMessage { text } => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if next.sending {
                return Err(TransitionError::SendInFlight);
            }
            if next.conversation_id.is_empty() {
                return Err(TransitionError::NoConversation);
            }

            let local_id = next.allocate_local_id();
            next.messages.push(Message::pending_user(local_id, text.clone()));
            next.draft = text.clone();
            next.sending = true;
            let conversation_id = next.conversation_id.clone();
            Ok(TransitionResult::new(next).with_effect(Effect::request(Request::PostMessage {
                conversation_id,
                local_id,
                text,
            })))
        }

        ShellEvent::RetryMessage { local_id } => {
            if next.sending {
                return Err(TransitionError::SendInFlight);
            }
            let index = next
                .messages
                .iter()
                .position(|m| m.local_id == local_id)
                .ok_or(TransitionError::UnknownMessage(local_id))?;
            if !next.messages[index].is_retryable() {
                return Err(TransitionError::NotRetryable(local_id));
            }

            // Re-queue at the end so the transcript keeps the service's order.
            let mut message = next.messages.remove(index);
            message.status = MessageStatus::Pending;
            let text = message.text.clone();
            next.messages.push(message);
            next.sending = true;
            let conversation_id = next.conversation_id.clone();
            Ok(TransitionResult::new(next).with_effect(Effect::request(Request::PostMessage {
                conversation_id,
                local_id,
                text,
            })))
        }

        ShellEvent::MessageSent {
            conversation_id,
            local_id,
            result,
        } => {
            next.ensure_active(&conversation_id)?;
            let Some(index) = next.messages.iter().position(|m| m.local_id == local_id) else {
                return Err(TransitionError::stale(conversation_id));
            };
            next.sending = false;

            match result {
                Ok(reply) => {
                    next.messages[index].status = MessageStatus::Confirmed;
                    let assistant_id = next.allocate_local_id();
                    next.messages.push(Message::assistant(
                        assistant_id,
                        reply.response,
                        reply.message_id,
                    ));
                    next.draft.clear();
                }
                Err(_) => next.messages[index].status = MessageStatus::Failed,
            }
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Clearing / starting over
        // ============================================================
        ShellEvent::ClearConversation => {
            let Some(conversation_id) = next.export_target().map(str::to_string) else {
                return Err(TransitionError::NoConversation);
            };
            Ok(TransitionResult::new(next).with_effect(Effect::request(
                Request::ClearConversation { conversation_id },
            )))
        }

        ShellEvent::ConversationCleared {
            conversation_id,
            result,
        } => {
            next.ensure_active(&conversation_id)?;
            match result {
                Ok(cleared) => {
                    let adopted = if cleared.conversation_id.trim().is_empty() {
                        conversation_id
                    } else {
                        cleared.conversation_id
                    };
                    let cancel = next.switch_to(adopted);
                    Ok(TransitionResult::new(next).with_effects(cancel))
                }
                Err(_) => Ok(TransitionResult::new(next)),
            }
        }

        ShellEvent::StartNewConversation { fresh_id } => {
            let cancel = next.switch_to(fresh_id);
            Ok(TransitionResult::new(next).with_effects(cancel))
        }

        ShellEvent::ConversationDeleted {
            conversation_id,
            fresh_id,
        } => {
            // A load still in flight for the deleted conversation must not land.
            if next.pending_load.as_deref() == Some(conversation_id.as_str()) {
                next.pending_load = None;
            }
            if next.conversation_id != conversation_id {
                return Ok(TransitionResult::new(next));
            }
            let cancel = next.switch_to(fresh_id);
            Ok(TransitionResult::new(next).with_effects(cancel))
        }

        // ============================================================
        // Feedback
        // ============================================================
        ShellEvent::SendFeedback { local_id, positive } => {
            let message = next
                .message(local_id)
                .ok_or(TransitionError::UnknownMessage(local_id))?;
            let Some(message_id) = message.id.clone() else {
                return Err(TransitionError::MessageNotPersisted(local_id));
            };
            if message.is_rated() {
                return Err(TransitionError::AlreadyRated(local_id));
            }
            if next.is_feedback_pending(&message_id) {
                return Err(TransitionError::FeedbackInFlight(local_id));
            }

            next.pending_feedback.push(message_id.clone());
            let conversation_id = next.conversation_id.clone();
            Ok(TransitionResult::new(next).with_effect(Effect::request(Request::PostFeedback {
                conversation_id,
                message_id,
                positive,
            })))
        }

        ShellEvent::FeedbackRecorded {
            conversation_id,
            message_id,
            positive,
            result,
        } => {
            next.ensure_active(&conversation_id)?;
            next.pending_feedback.retain(|id| id != &message_id);
            if result.is_ok() {
                // Matched by identifier only; a reloaded list may no longer hold it.
                if let Some(message) = next
                    .messages
                    .iter_mut()
                    .find(|m| m.id.as_ref() == Some(&message_id))
                {
                    message.feedback = Some(Feedback::from_positive(positive));
                }
            }
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // System prompt
        // ============================================================
        ShellEvent::ToggleSystemPromptEditor => {
            next.system_prompt_open = !next.system_prompt_open;
            Ok(TransitionResult::new(next))
        }

        ShellEvent::SaveSystemPrompt { text } => {
            if next.conversation_id.is_empty() {
                return Err(TransitionError::NoConversation);
            }
            next.system_prompt.clone_from(&text);
            let conversation_id = next.conversation_id.clone();
            Ok(
                TransitionResult::new(next).with_effect(Effect::request(
                    Request::PostSystemPrompt {
                        conversation_id,
                        system_prompt: text,
                    },
                )),
            )
        }

        ShellEvent::SystemPromptSaved {
            conversation_id,
            result,
        } => {
            next.ensure_active(&conversation_id)?;
            if result.is_ok() {
                next.system_prompt_open = false;
            }
            Ok(TransitionResult::new(next))
        }
    }
}

/// Serializable status summary, used by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ShellStatus<'a> {
    pub conversation_id: &'a str,
    pub messages: usize,
    pub loading: bool,
}

impl ConversationState {
    pub fn status(&self) -> ShellStatus<'_> {
        ShellStatus {
            conversation_id: &self.conversation_id,
            messages: self.messages.len(),
            loading: self.is_loading(),
        }
    }
}

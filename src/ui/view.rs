//! View model: the part of the UI state a template needs, flattened.

use serde::Serialize;

use crate::api::export_file_name;
use crate::config::UiConfig;
use crate::runtime::Snapshot;
use crate::session::{ConversationState, Feedback, HistoryPanel, Message, MessageStatus, Sender};

#[derive(Debug, Serialize)]
pub struct PageView<'a> {
    pub title: &'a str,
    pub assistant_name: &'a str,
    pub htmx_src: &'a str,
    pub chat: ChatView,
    pub history: HistoryView,
}

impl<'a> PageView<'a> {
    pub fn new(snapshot: &Snapshot, ui: &'a UiConfig) -> Self {
        Self {
            title: &ui.title,
            assistant_name: &ui.assistant_name,
            htmx_src: &ui.htmx_src,
            chat: ChatView::new(&snapshot.shell, snapshot.export_url.clone()),
            history: HistoryView::new(&snapshot.history, &snapshot.shell.conversation_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatView {
    pub conversation_id: String,
    pub messages: Vec<MessageView>,
    pub draft: String,
    pub system_prompt: String,
    pub system_prompt_open: bool,
    /// Drives the typing indicator.
    pub sending: bool,
    /// A saved conversation is being fetched.
    pub loading: bool,
    pub export_url: Option<String>,
    pub export_file_name: String,
}

impl ChatView {
    pub fn new(shell: &ConversationState, export_url: Option<String>) -> Self {
        Self {
            conversation_id: shell.conversation_id.clone(),
            messages: shell
                .messages
                .iter()
                .map(|m| MessageView::new(shell, m))
                .collect(),
            draft: shell.draft.clone(),
            system_prompt: shell.system_prompt.clone(),
            system_prompt_open: shell.system_prompt_open,
            sending: shell.sending,
            loading: shell.pending_load.is_some(),
            export_url,
            export_file_name: export_file_name(&shell.conversation_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub local_id: u64,
    pub sender: Sender,
    pub text: String,
    pub feedback: Option<Feedback>,
    /// Whether the rating buttons are offered.
    pub can_rate: bool,
    pub pending: bool,
    pub failed: bool,
}

impl MessageView {
    fn new(shell: &ConversationState, message: &Message) -> Self {
        let can_rate = message.sender == Sender::Assistant
            && !message.is_rated()
            && message
                .id
                .as_ref()
                .is_some_and(|id| !shell.is_feedback_pending(id));
        Self {
            local_id: message.local_id,
            sender: message.sender,
            text: message.text.clone(),
            feedback: message.feedback,
            can_rate,
            pending: message.status == MessageStatus::Pending,
            failed: message.status == MessageStatus::Failed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub visible: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub alert: Option<String>,
    pub entries: Vec<HistoryEntryView>,
    /// Conversation awaiting delete confirmation.
    pub confirm: Option<HistoryEntryView>,
}

impl HistoryView {
    pub fn new(panel: &HistoryPanel, active_id: &str) -> Self {
        let entries = panel
            .conversations
            .iter()
            .map(|c| HistoryEntryView {
                id: c.id.clone(),
                title: c.display_title().to_string(),
                updated_at: c.updated_at.as_ref().map(|_| c.display_updated_at()),
                active: c.id == active_id,
            })
            .collect();
        let confirm = panel.pending_delete.as_ref().map(|id| {
            let title = panel
                .pending_delete_summary()
                .map_or_else(|| id.clone(), |c| c.display_title().to_string());
            HistoryEntryView {
                id: id.clone(),
                title,
                updated_at: None,
                active: id == active_id,
            }
        });

        Self {
            visible: panel.visible,
            loading: panel.loading,
            error: panel.error.clone(),
            alert: panel.alert.clone(),
            entries,
            confirm,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryView {
    pub id: String,
    pub title: String,
    pub updated_at: Option<String>,
    /// The conversation currently open in the chat shell.
    pub active: bool,
}

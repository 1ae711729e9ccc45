//! Single-task controller driving the UI state.
//!
//! The controller owns the chat shell and the history panel. Commands from
//! the web layer and completions from the chat service are processed one at
//! a time on one task, so state is never shared between threads; only the
//! HTTP requests themselves run concurrently, each on its own task.
//!
//! Requests that belong to a conversation are registered under the
//! conversation that was active when they were issued. Switching away
//! cancels them, and any completion that still slips through is rejected by
//! the transition as stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, ChatBackend};
use crate::session::{
    ConversationState, Effect, HistoryEvent, HistoryPanel, Request, ShellEvent, history, shell,
};

use super::ids::ConversationIds;

const COMMAND_BUFFER: usize = 64;

/// Something the user did in the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EditDraft(String),
    SendMessage(String),
    RetryMessage(u64),
    LoadConversation(String),
    ClearConversation,
    StartNewConversation,
    SendFeedback { local_id: u64, positive: bool },
    ToggleSystemPromptEditor,
    SaveSystemPrompt(String),
    ToggleHistory,
    SelectConversation(String),
    RequestDelete(String),
    ConfirmDelete,
    CancelDelete,
    DismissAlert,
}

/// Copy of the UI state taken between two events.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub shell: ConversationState,
    pub history: HistoryPanel,
    /// Transcript download location of the active conversation.
    pub export_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Controller has shut down")]
    Closed,
}

/// Held by every task spawned for one action. The dispatcher waits until
/// all clones are dropped.
type Settle = mpsc::Sender<()>;

#[derive(Debug)]
enum Event {
    Shell(ShellEvent),
    History(HistoryEvent),
}

struct Completion {
    event: Event,
    settle: Settle,
}

enum Command {
    Dispatch { action: Action, settle: Settle },
    Snapshot { reply: oneshot::Sender<Snapshot> },
}

/// Cloneable entry point used by request handlers.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
}

impl ControllerHandle {
    /// Apply an action and wait until every request it caused has settled.
    ///
    /// Rejected actions return `Ok` as well; rejections are logged, not surfaced.
    pub async fn dispatch(&self, action: Action) -> Result<(), ControllerError> {
        let (settle, mut settled) = mpsc::channel(1);
        self.commands
            .send(Command::Dispatch { action, settle })
            .await
            .map_err(|_| ControllerError::Closed)?;
        // Nothing is ever sent; `recv` yields `None` once all clones are gone.
        let _ = settled.recv().await;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<Snapshot, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }
}

pub struct Controller {
    backend: Arc<dyn ChatBackend>,
    shell: ConversationState,
    history: HistoryPanel,
    ids: ConversationIds,
    in_flight: HashMap<String, CancellationToken>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("shell", &self.shell)
            .field("history", &self.history)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Create a mounted controller: the shell already has a fresh identifier.
    pub fn new(backend: Arc<dyn ChatBackend>, system_prompt: impl Into<String>) -> Self {
        let mut ids = ConversationIds::new();
        let unmounted = ConversationState::new(system_prompt);
        let mount = ShellEvent::Mount {
            fresh_id: ids.next_id(),
        };
        let shell = match shell::transition(&unmounted, mount) {
            Ok(result) => result.new_state,
            Err(_) => unmounted,
        };
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            backend,
            shell,
            history: HistoryPanel::default(),
            ids,
            in_flight: HashMap::new(),
            completions_tx,
            completions_rx,
        }
    }

    /// Move the controller onto its own task.
    pub fn spawn(self) -> ControllerHandle {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        info!(
            name: "ui.controller.started",
            conversation_id = %self.shell.conversation_id,
            "Chat controller started"
        );
        tokio::spawn(self.run(rx));
        ControllerHandle { commands }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                Some(Completion { event, settle }) = self.completions_rx.recv() => {
                    self.apply(event, &settle);
                }
                command = commands.recv() => match command {
                    Some(Command::Dispatch { action, settle }) => {
                        let event = self.event_for(action);
                        self.apply(event, &settle);
                    }
                    Some(Command::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    None => break,
                },
            }
        }

        for token in self.in_flight.values() {
            token.cancel();
        }
        debug!(name: "ui.controller.stopped", "Chat controller stopped");
    }

    fn event_for(&mut self, action: Action) -> Event {
        match action {
            Action::EditDraft(text) => Event::Shell(ShellEvent::EditDraft { text }),
            Action::SendMessage(text) => Event::Shell(ShellEvent::SendMessage { text }),
            Action::RetryMessage(local_id) => Event::Shell(ShellEvent::RetryMessage { local_id }),
            Action::LoadConversation(conversation_id) => {
                Event::Shell(ShellEvent::LoadConversation { conversation_id })
            }
            Action::ClearConversation => Event::Shell(ShellEvent::ClearConversation),
            Action::StartNewConversation => Event::Shell(ShellEvent::StartNewConversation {
                fresh_id: self.ids.next_id(),
            }),
            Action::SendFeedback { local_id, positive } => {
                Event::Shell(ShellEvent::SendFeedback { local_id, positive })
            }
            Action::ToggleSystemPromptEditor => Event::Shell(ShellEvent::ToggleSystemPromptEditor),
            Action::SaveSystemPrompt(text) => Event::Shell(ShellEvent::SaveSystemPrompt { text }),
            Action::ToggleHistory => Event::History(HistoryEvent::Toggle),
            Action::SelectConversation(conversation_id) => {
                Event::History(HistoryEvent::Select { conversation_id })
            }
            Action::RequestDelete(conversation_id) => {
                Event::History(HistoryEvent::RequestDelete { conversation_id })
            }
            Action::ConfirmDelete => Event::History(HistoryEvent::ConfirmDelete),
            Action::CancelDelete => Event::History(HistoryEvent::CancelDelete),
            Action::DismissAlert => Event::History(HistoryEvent::DismissAlert),
        }
    }

    fn apply(&mut self, event: Event, settle: &Settle) {
        let outcome = match event {
            Event::Shell(event) => shell::transition(&self.shell, event).map(|result| {
                self.shell = result.new_state;
                result.effects
            }),
            Event::History(event) => history::transition(&self.history, event).map(|result| {
                self.history = result.new_state;
                result.effects
            }),
        };

        match outcome {
            Ok(effects) => {
                for effect in effects {
                    self.execute(effect, settle);
                }
            }
            Err(err) if err.is_stale() => {
                debug!(name: "ui.completion.stale", reason = %err, "Dropped stale completion");
            }
            Err(err) => {
                warn!(name: "ui.action.rejected", reason = %err, "Action rejected");
            }
        }
    }

    fn execute(&mut self, effect: Effect, settle: &Settle) {
        match effect {
            Effect::Request(request) => self.spawn_request(request, settle.clone()),
            Effect::CancelRequests { conversation_id } => {
                if let Some(token) = self.in_flight.remove(&conversation_id) {
                    debug!(
                        name: "ui.requests.cancelled",
                        conversation_id = %conversation_id,
                        "Cancelled outstanding requests"
                    );
                    token.cancel();
                }
            }
            Effect::SelectConversation { conversation_id } => {
                self.apply(
                    Event::Shell(ShellEvent::LoadConversation { conversation_id }),
                    settle,
                );
            }
            Effect::ConversationRemoved { conversation_id } => {
                let fresh_id = self.ids.next_id();
                self.apply(
                    Event::Shell(ShellEvent::ConversationDeleted {
                        conversation_id,
                        fresh_id,
                    }),
                    settle,
                );
            }
        }
    }

    fn spawn_request(&mut self, request: Request, settle: Settle) {
        let token = if request.is_conversation_scoped() {
            self.in_flight
                .entry(self.shell.conversation_id.clone())
                .or_default()
                .child_token()
        } else {
            CancellationToken::new()
        };
        let backend = Arc::clone(&self.backend);
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(name: "ui.request.cancelled", "Request cancelled before completion");
                }
                event = perform(backend.as_ref(), request) => {
                    // Fails only when the controller is gone.
                    let _ = completions.send(Completion { event, settle });
                }
            }
        });
    }

    fn snapshot(&self) -> Snapshot {
        let export_url = self
            .shell
            .export_target()
            .and_then(|id| self.backend.export_url(id).ok())
            .map(|url| url.to_string());
        Snapshot {
            shell: self.shell.clone(),
            history: self.history.clone(),
            export_url,
        }
    }
}

fn log_failure<T>(result: &Result<T, ApiError>, operation: &'static str, conversation_id: &str) {
    if let Err(e) = result {
        error!(
            name: "chat.request.failed",
            operation,
            conversation_id = %conversation_id,
            kind = e.kind(),
            error = %e,
            "Chat service request failed"
        );
    }
}

/// Run one request against the service and turn its outcome into an event.
async fn perform(backend: &dyn ChatBackend, request: Request) -> Event {
    match request {
        Request::FetchConversations { generation } => {
            let result = backend.list_conversations().await;
            log_failure(&result, "list_conversations", "");
            Event::History(HistoryEvent::ListFetched { generation, result })
        }
        Request::FetchMessages { conversation_id } => {
            let result = backend.conversation_messages(&conversation_id).await;
            log_failure(&result, "load_conversation", &conversation_id);
            Event::Shell(ShellEvent::MessagesLoaded {
                conversation_id,
                result,
            })
        }
        Request::PostMessage {
            conversation_id,
            local_id,
            text,
        } => {
            let result = backend.send_message(&conversation_id, &text).await;
            log_failure(&result, "send_message", &conversation_id);
            if result.is_ok() {
                info!(
                    name: "chat.message.answered",
                    conversation_id = %conversation_id,
                    "Assistant replied"
                );
            }
            Event::Shell(ShellEvent::MessageSent {
                conversation_id,
                local_id,
                result,
            })
        }
        Request::ClearConversation { conversation_id } => {
            let result = backend.clear_conversation(&conversation_id).await;
            log_failure(&result, "clear_conversation", &conversation_id);
            Event::Shell(ShellEvent::ConversationCleared {
                conversation_id,
                result,
            })
        }
        Request::PostFeedback {
            conversation_id,
            message_id,
            positive,
        } => {
            let result = backend
                .send_feedback(&conversation_id, &message_id, positive)
                .await;
            log_failure(&result, "send_feedback", &conversation_id);
            Event::Shell(ShellEvent::FeedbackRecorded {
                conversation_id,
                message_id,
                positive,
                result,
            })
        }
        Request::PostSystemPrompt {
            conversation_id,
            system_prompt,
        } => {
            let result = backend
                .update_system_message(&conversation_id, &system_prompt)
                .await;
            log_failure(&result, "update_system_message", &conversation_id);
            Event::Shell(ShellEvent::SystemPromptSaved {
                conversation_id,
                result,
            })
        }
        Request::DeleteConversation { conversation_id } => {
            let result = backend.delete_conversation(&conversation_id).await;
            log_failure(&result, "delete_conversation", &conversation_id);
            if result.is_ok() {
                info!(
                    name: "history.conversation.deleted",
                    conversation_id = %conversation_id,
                    "Conversation deleted"
                );
            }
            Event::History(HistoryEvent::Deleted {
                conversation_id,
                result,
            })
        }
    }
}

//! History panel state and its pure transition function.

use crate::api::{ApiError, ConversationSummary};

use super::effect::{Effect, Request, TransitionError, TransitionResult};

/// Shown when the conversation list cannot be fetched.
pub const LIST_ERROR: &str = "Could not load conversations. Please try again later.";

/// Shown when a deletion fails.
pub const DELETE_ERROR: &str = "Could not delete the conversation.";

/// Saved-conversation list, fetched every time the panel opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPanel {
    pub visible: bool,
    pub conversations: Vec<ConversationSummary>,
    pub loading: bool,
    pub error: Option<String>,
    /// Conversation awaiting the user's delete confirmation.
    pub pending_delete: Option<String>,
    /// Blocking notice the user has to dismiss.
    pub alert: Option<String>,
    /// Bumped on every opening; only the matching list response is applied.
    pub list_generation: u64,
}

impl HistoryPanel {
    pub fn pending_delete_summary(&self) -> Option<&ConversationSummary> {
        let id = self.pending_delete.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }
}

/// Inputs of the history panel.
#[derive(Debug)]
pub enum HistoryEvent {
    Toggle,
    ListFetched {
        generation: u64,
        result: Result<Vec<ConversationSummary>, ApiError>,
    },
    Select { conversation_id: String },
    RequestDelete { conversation_id: String },
    ConfirmDelete,
    CancelDelete,
    Deleted {
        conversation_id: String,
        result: Result<(), ApiError>,
    },
    DismissAlert,
}

/// Pure transition function of the history panel.
pub fn transition(
    state: &HistoryPanel,
    event: HistoryEvent,
) -> Result<TransitionResult<HistoryPanel>, TransitionError> {
    let mut next = state.clone();

    match event {
        HistoryEvent::Toggle => {
            next.visible = !next.visible;
            if !next.visible {
                next.pending_delete = None;
                return Ok(TransitionResult::new(next));
            }
            next.loading = true;
            next.list_generation += 1;
            let generation = next.list_generation;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::request(Request::FetchConversations { generation })))
        }

        HistoryEvent::ListFetched { generation, result } => {
            if generation != next.list_generation {
                return Err(TransitionError::StaleList(generation));
            }
            next.loading = false;
            match result {
                Ok(conversations) => {
                    next.conversations = conversations;
                    next.error = None;
                }
                Err(_) => next.error = Some(LIST_ERROR.to_string()),
            }
            Ok(TransitionResult::new(next))
        }

        HistoryEvent::Select { conversation_id } => {
            if conversation_id.trim().is_empty() {
                return Err(TransitionError::EmptyConversationId);
            }
            Ok(TransitionResult::new(next).with_effect(Effect::SelectConversation { conversation_id }))
        }

        HistoryEvent::RequestDelete { conversation_id } => {
            if conversation_id.trim().is_empty() {
                return Err(TransitionError::EmptyConversationId);
            }
            next.pending_delete = Some(conversation_id);
            Ok(TransitionResult::new(next))
        }

        HistoryEvent::ConfirmDelete => {
            let conversation_id = next
                .pending_delete
                .take()
                .ok_or(TransitionError::NothingToConfirm)?;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::request(Request::DeleteConversation { conversation_id })))
        }

        HistoryEvent::CancelDelete => {
            next.pending_delete = None;
            Ok(TransitionResult::new(next))
        }

        HistoryEvent::Deleted {
            conversation_id,
            result,
        } => match result {
            Ok(()) => {
                next.conversations.retain(|c| c.id != conversation_id);
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::ConversationRemoved { conversation_id }))
            }
            Err(_) => {
                next.alert = Some(DELETE_ERROR.to_string());
                Ok(TransitionResult::new(next))
            }
        },

        HistoryEvent::DismissAlert => {
            next.alert = None;
            Ok(TransitionResult::new(next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(state: &HistoryPanel, event: HistoryEvent) -> (HistoryPanel, Vec<Effect>) {
        let result = transition(state, event).expect("transition should be accepted");
        (result.new_state, result.effects)
    }

    fn summary(id: &str) -> ConversationSummary {
        ConversationSummary {
            id: id.into(),
            title: Some(format!("Conversation {id}")),
            updated_at: Some("2024-05-01T12:00:00".into()),
        }
    }

    fn failure() -> ApiError {
        ApiError::Api {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn every_opening_fetches_exactly_once() {
        let mut state = HistoryPanel::default();
        let mut fetches = 0;
        for _ in 0..4 {
            let (next, effects) = apply(&state, HistoryEvent::Toggle);
            fetches += effects
                .iter()
                .filter(|e| matches!(e, Effect::Request(Request::FetchConversations { .. })))
                .count();
            state = next;
        }
        assert_eq!(fetches, 2);
        assert!(!state.visible);
    }

    #[test]
    fn fetch_success_replaces_list_and_clears_error() {
        let state = HistoryPanel {
            error: Some(LIST_ERROR.into()),
            ..HistoryPanel::default()
        };
        let (next, _) = apply(&state, HistoryEvent::ListFetched {
            generation: 0,
            result: Ok(vec![summary("a"), summary("b")]),
        });
        assert_eq!(next.conversations.len(), 2);
        assert_eq!(next.error, None);
        assert!(!next.loading);
    }

    #[test]
    fn fetch_failure_keeps_previous_list() {
        let state = HistoryPanel {
            conversations: vec![summary("a")],
            loading: true,
            ..HistoryPanel::default()
        };
        let (next, _) = apply(&state, HistoryEvent::ListFetched {
            generation: 0,
            result: Err(failure()),
        });
        assert_eq!(next.conversations, vec![summary("a")]);
        assert_eq!(next.error.as_deref(), Some(LIST_ERROR));
        assert!(!next.loading);
    }

    #[test]
    fn list_from_an_earlier_opening_is_dropped() {
        let (opened, _) = apply(&HistoryPanel::default(), HistoryEvent::Toggle);
        let (closed, _) = apply(&opened, HistoryEvent::Toggle);
        let (reopened, effects) = apply(&closed, HistoryEvent::Toggle);
        assert_eq!(effects, vec![Effect::Request(Request::FetchConversations {
            generation: 2,
        })]);

        let (fresh, _) = apply(&reopened, HistoryEvent::ListFetched {
            generation: 2,
            result: Ok(vec![summary("new")]),
        });
        let err = transition(&fresh, HistoryEvent::ListFetched {
            generation: 1,
            result: Ok(vec![summary("old"), summary("deleted-since")]),
        })
        .unwrap_err();

        assert_eq!(err, TransitionError::StaleList(1));
        assert!(err.is_stale());
        assert_eq!(fresh.conversations, vec![summary("new")]);
    }

    #[test]
    fn closing_discards_pending_confirmation() {
        let (opened, _) = apply(&HistoryPanel::default(), HistoryEvent::Toggle);
        let (asked, _) = apply(&opened, HistoryEvent::RequestDelete {
            conversation_id: "a".into(),
        });

        let (closed, _) = apply(&asked, HistoryEvent::Toggle);
        let (reopened, _) = apply(&closed, HistoryEvent::Toggle);

        assert_eq!(closed.pending_delete, None);
        assert_eq!(reopened.pending_delete, None);
    }

    #[test]
    fn delete_needs_confirmation() {
        let state = HistoryPanel {
            conversations: vec![summary("a")],
            ..HistoryPanel::default()
        };
        let (asked, effects) = apply(&state, HistoryEvent::RequestDelete {
            conversation_id: "a".into(),
        });
        assert!(effects.is_empty());
        assert_eq!(asked.pending_delete_summary(), Some(&summary("a")));

        let (cancelled, effects) = apply(&asked, HistoryEvent::CancelDelete);
        assert!(effects.is_empty());
        assert_eq!(cancelled.pending_delete, None);
        assert_eq!(
            transition(&cancelled, HistoryEvent::ConfirmDelete).unwrap_err(),
            TransitionError::NothingToConfirm
        );

        let (_, effects) = apply(&asked, HistoryEvent::ConfirmDelete);
        assert_eq!(effects, vec![Effect::Request(Request::DeleteConversation {
            conversation_id: "a".into(),
        })]);
    }

    #[test]
    fn delete_removes_only_the_matching_entry() {
        let state = HistoryPanel {
            conversations: vec![summary("a"), summary("b"), summary("c")],
            ..HistoryPanel::default()
        };
        let (next, effects) = apply(&state, HistoryEvent::Deleted {
            conversation_id: "b".into(),
            result: Ok(()),
        });
        let ids: Vec<_> = next.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(effects, vec![Effect::ConversationRemoved {
            conversation_id: "b".into(),
        }]);
    }

    #[test]
    fn failed_delete_raises_alert_and_keeps_list() {
        let state = HistoryPanel {
            conversations: vec![summary("a")],
            ..HistoryPanel::default()
        };
        let (next, effects) = apply(&state, HistoryEvent::Deleted {
            conversation_id: "a".into(),
            result: Err(failure()),
        });
        assert!(effects.is_empty());
        assert_eq!(next.conversations, state.conversations);
        assert_eq!(next.alert.as_deref(), Some(DELETE_ERROR));

        let (dismissed, _) = apply(&next, HistoryEvent::DismissAlert);
        assert_eq!(dismissed.alert, None);
    }

    #[test]
    fn selection_is_forwarded_upward() {
        let (_, effects) = apply(&HistoryPanel::default(), HistoryEvent::Select {
            conversation_id: "a".into(),
        });
        assert_eq!(effects, vec![Effect::SelectConversation {
            conversation_id: "a".into(),
        }]);
    }
}

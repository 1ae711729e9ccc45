//! Client-side conversation state.
//!
//! Both UI components are plain state containers driven by pure transition
//! functions. Nothing here performs I/O; the [`crate::runtime`] controller
//! executes the [`Effect`]s a transition returns and feeds the outcomes back
//! as events.
//!
//! # Architecture
//!
//! - [`ConversationState`]: The chat shell, i.e. the active conversation
//! - [`HistoryPanel`]: The list of saved conversations
//! - [`Effect`]: Requests and notifications a transition asks for
//!
//! # Example
//!
//! ```rust
//! use orito_chat::session::{ConversationState, ShellEvent, shell};
//!
//! let state = ConversationState::default();
//! let mounted = shell::transition(&state, ShellEvent::Mount { fresh_id: "1".into() })
//!     .unwrap()
//!     .new_state;
//! let sent = shell::transition(&mounted, ShellEvent::SendMessage { text: "Hello!".into() })
//!     .unwrap();
//!
//! assert_eq!(sent.new_state.messages.len(), 1);
//! assert_eq!(sent.effects.len(), 1);
//! ```

pub mod effect;
pub mod history;
pub mod message;
pub mod shell;

pub use effect::{Effect, Request, TransitionError, TransitionResult};
pub use history::{HistoryEvent, HistoryPanel};
pub use message::{Feedback, Message, MessageStatus, Sender};
pub use shell::{ConversationState, ShellEvent};

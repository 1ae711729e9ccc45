//! Runs the session state machines against the chat service.

pub mod controller;
pub mod ids;

pub use controller::{Action, Controller, ControllerError, ControllerHandle, Snapshot};
pub use ids::ConversationIds;

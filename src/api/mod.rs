//! Client side of the external chat service.
//!
//! # Modules
//!
//! - [`client`]: [`ChatBackend`] trait and its reqwest implementation
//! - [`types`]: Wire DTOs
//! - [`error`]: [`ApiError`] and the module `Result` alias

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, ChatBackend, export_file_name};
pub use error::{ApiError, Result};
pub use types::{
    ClearConversationResponse, ConversationSummary, MessageId, MessageRecord, Role,
    SendMessageResponse,
};

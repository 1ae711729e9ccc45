//! HTML-first web client for a REST chat service.
//!
//! The browser talks only to this server. Every control is a form post that
//! is turned into an action on a single controller task, which calls the
//! chat service and keeps the UI state; the page is then rendered again.
//!
//! # Architecture
//!
//! - **Server**: Axum routes mapping form posts to actions (post/redirect/get)
//! - **Session**: Pure state machines for the chat shell and history panel
//! - **Runtime**: Controller task executing effects against the chat service
//! - **UI**: Minijinja templates progressively enhanced with HTMX
//!
//! # Modules
//!
//! - [`api`]: Chat service client and wire types
//! - [`config`]: Layered configuration
//! - [`runtime`]: Controller and identifier generation
//! - [`session`]: Conversation state and transitions
//! - [`ui`]: Templates and view model

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod config;
pub mod runtime;
pub mod server;
pub mod session;
pub mod ui;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::runtime::ControllerHandle;
use crate::ui::Templates;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Entry point to the controller task owning the UI state.
    pub controller: ControllerHandle,
    pub templates: Arc<Templates>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::AppState;
use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::runtime::{Action, Controller, ControllerError};
use crate::ui::{PageView, Templates};

/// Start the web UI with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&config.api).context("Invalid chat service settings")?;
    info!(
        name: "chat.api.configured",
        base_url = %client.base_url(),
        timeout_secs = ?config.api.request_timeout_secs,
        "Chat service configured"
    );

    let controller =
        Controller::new(Arc::new(client), config.ui.default_system_prompt.clone()).spawn();
    let templates = Templates::new().context("Failed to compile page templates")?;

    let state = AppState {
        controller,
        templates: Arc::new(templates),
        config: Arc::clone(&config),
    };

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!(name: "server.stopping", "Shutdown requested");
}

/// Build the router. Every mutating route answers with `303 See Other` to `/`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/conversations/{id}", get(open_conversation))
        .route("/chat/send", post(send_message))
        .route("/chat/draft", post(edit_draft))
        .route("/chat/retry", post(retry_message))
        .route("/chat/new", post(new_conversation))
        .route("/chat/clear", post(clear_conversation))
        .route("/chat/feedback", post(send_feedback))
        .route("/chat/system-prompt/toggle", post(toggle_system_prompt))
        .route("/chat/system-prompt", post(save_system_prompt))
        .route("/chat/export", get(export_conversation))
        .route("/history/toggle", post(toggle_history))
        .route("/history/select", post(select_conversation))
        .route("/history/delete", post(request_delete))
        .route("/history/delete/confirm", post(confirm_delete))
        .route("/history/delete/cancel", post(cancel_delete))
        .route("/history/alert/dismiss", post(dismiss_alert))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum UiError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("Page rendering failed: {0}")]
    Render(#[from] minijinja::Error),
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        error!(name: "ui.request.failed", error = %self, "Request failed");
        let status = match self {
            Self::Controller(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, "Something went wrong. Please reload the page.").into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Forms
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    local_id: u64,
}

#[derive(Debug, Deserialize)]
struct FeedbackForm {
    local_id: u64,
    positive: bool,
}

#[derive(Debug, Deserialize)]
struct SystemPromptForm {
    #[serde(default)]
    system_prompt: String,
}

#[derive(Debug, Deserialize)]
struct ConversationForm {
    #[serde(default)]
    conversation_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Dispatch an action, wait for its requests up to the configured limit,
/// then send the browser back to the page.
async fn apply(state: &AppState, action: Action) -> Result<Redirect, UiError> {
    let limit = state.config.ui.settle_timeout();
    match tokio::time::timeout(limit, state.controller.dispatch(action)).await {
        Ok(result) => result?,
        Err(_) => warn!(
            name: "ui.action.unsettled",
            timeout_secs = limit.as_secs(),
            "Chat service still busy, rendering current state"
        ),
    }
    Ok(Redirect::to("/"))
}

/// GET / - Render the chat page.
async fn index(State(state): State<AppState>) -> Result<Html<String>, UiError> {
    let snapshot = state.controller.snapshot().await?;
    let view = PageView::new(&snapshot, &state.config.ui);
    Ok(Html(state.templates.render_page(&view)?))
}

/// GET /healthz
async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, UiError> {
    let snapshot = state.controller.snapshot().await?;
    Ok(Json(json!({
        "status": "ok",
        "chat": snapshot.shell.status(),
    })))
}

/// GET /conversations/{id} - Open a saved conversation by link.
async fn open_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::LoadConversation(id)).await
}

async fn send_message(
    State(state): State<AppState>,
    Form(form): Form<MessageForm>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::SendMessage(form.message)).await
}

/// POST /chat/draft - Keep the composer text across page loads.
async fn edit_draft(
    State(state): State<AppState>,
    Form(form): Form<MessageForm>,
) -> Result<StatusCode, UiError> {
    state
        .controller
        .dispatch(Action::EditDraft(form.message))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn retry_message(
    State(state): State<AppState>,
    Form(form): Form<MessageRef>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::RetryMessage(form.local_id)).await
}

async fn new_conversation(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::StartNewConversation).await
}

async fn clear_conversation(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::ClearConversation).await
}

async fn send_feedback(
    State(state): State<AppState>,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::SendFeedback {
        local_id: form.local_id,
        positive: form.positive,
    })
    .await
}

async fn toggle_system_prompt(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::ToggleSystemPromptEditor).await
}

async fn save_system_prompt(
    State(state): State<AppState>,
    Form(form): Form<SystemPromptForm>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::SaveSystemPrompt(form.system_prompt)).await
}

/// GET /chat/export - Hand the download over to the chat service.
async fn export_conversation(State(state): State<AppState>) -> Result<Redirect, UiError> {
    let snapshot = state.controller.snapshot().await?;
    Ok(match snapshot.export_url {
        Some(url) => Redirect::to(&url),
        None => Redirect::to("/"),
    })
}

async fn toggle_history(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::ToggleHistory).await
}

async fn select_conversation(
    State(state): State<AppState>,
    Form(form): Form<ConversationForm>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::SelectConversation(form.conversation_id)).await
}

async fn request_delete(
    State(state): State<AppState>,
    Form(form): Form<ConversationForm>,
) -> Result<Redirect, UiError> {
    apply(&state, Action::RequestDelete(form.conversation_id)).await
}

async fn confirm_delete(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::ConfirmDelete).await
}

async fn cancel_delete(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::CancelDelete).await
}

async fn dismiss_alert(State(state): State<AppState>) -> Result<Redirect, UiError> {
    apply(&state, Action::DismissAlert).await
}

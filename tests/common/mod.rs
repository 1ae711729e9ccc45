//! In-process stand-in for the chat service, served over real HTTP.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// One request the chat service received.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
}

type Calls = Arc<Mutex<Vec<Call>>>;

pub struct ChatService {
    pub base_url: String,
    calls: Calls,
}

impl ChatService {
    pub async fn spawn() -> Self {
        let calls = Calls::default();
        let app = Router::new().fallback(handle).with_state(Arc::clone(&calls));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests made with `method` to `path`.
    pub fn calls_to(&self, method: &str, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }
}

/// Routes:
/// - conversation `missing` has no messages endpoint (404)
/// - conversation `locked` cannot be deleted (500)
/// - the message `fail` makes the chat endpoint fail (500)
async fn handle(State(calls): State<Calls>, method: Method, uri: Uri, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    calls.lock().unwrap().push(Call {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: body.clone(),
    });

    let segments: Vec<&str> = uri.path().trim_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["conversations"]) => Json(json!([
            { "conversation_id": "1", "title": "Trip planning", "updated_at": "2024-05-01T12:30:00" },
            { "conversation_id": "2", "title": null, "updated_at": null },
        ]))
        .into_response(),
        ("GET", ["conversations", "missing", "messages"]) => {
            (StatusCode::NOT_FOUND, "Conversation not found").into_response()
        }
        ("GET", ["conversations", _, "messages"]) => Json(json!([
            { "id": 1, "role": "system", "content": "Answer like a pirate." },
            { "id": 2, "role": "user", "content": "Where to?" },
            { "id": 3, "role": "assistant", "content": "Tortuga!" },
        ]))
        .into_response(),
        ("DELETE", ["conversations", "locked"]) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "locked").into_response()
        }
        ("DELETE", ["conversations", _]) => Json(json!({ "status": "deleted" })).into_response(),
        ("POST", ["chat"]) => {
            if body["message"] == "fail" {
                return (StatusCode::INTERNAL_SERVER_ERROR, "model offline").into_response();
            }
            Json(json!({
                "response": format!("echo: {}", body["message"].as_str().unwrap_or_default()),
                "message_id": 10,
                "conversation_id": body["conversation_id"],
            }))
            .into_response()
        }
        ("POST", ["clear-conversation"]) => {
            Json(json!({ "conversation_id": "srv-fresh" })).into_response()
        }
        ("POST", ["feedback" | "update-system-message"]) => {
            Json(json!({ "status": "ok" })).into_response()
        }
        ("GET", ["export-conversation", id]) => format!("transcript {id}").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

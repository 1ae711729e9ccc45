mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::ChatService;
use orito_chat::AppState;
use orito_chat::api::ApiClient;
use orito_chat::config::AppConfig;
use orito_chat::runtime::Controller;
use orito_chat::server::router;
use orito_chat::ui::Templates;
use serde_json::Value;

fn config_for(service: &ChatService) -> AppConfig {
    AppConfig::load_from_args(["orito-chat", "--api-url", service.base_url.as_str()])
        .expect("config should load")
}

async fn app() -> (TestServer, ChatService) {
    let service = ChatService::spawn().await;
    let config = config_for(&service);
    let client = ApiClient::from_config(&config.api).unwrap();
    let state = AppState {
        controller: Controller::new(Arc::new(client), config.ui.default_system_prompt.clone())
            .spawn(),
        templates: Arc::new(Templates::new().unwrap()),
        config: Arc::new(config),
    };
    (TestServer::new(router(state)).unwrap(), service)
}

fn assert_redirects_home(response: &axum_test::TestResponse) {
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
}

#[tokio::test]
async fn index_renders_empty_chat() {
    let (server, service) = app().await;

    let response = server.get("/").await;

    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("action=\"/chat/send\""));
    assert!(html.contains("Orito is typing…"));
    assert!(html.contains("href=\"/chat/export\""));
    assert!(!html.contains("id=\"history\""));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn sending_round_trips_through_the_service() {
    let (server, service) = app().await;

    let response = server
        .post("/chat/send")
        .form(&[("message", "Ahoy <there>")])
        .await;
    assert_redirects_home(&response);

    let html = server.get("/").await.text();
    assert!(html.contains("Ahoy &lt;there&gt;"));
    assert!(html.contains("echo: Ahoy &lt;there&gt;"));
    assert!(html.contains("action=\"/chat/feedback\""));
    assert_eq!(service.calls_to("POST", "/chat/").len(), 1);
}

#[tokio::test]
async fn blank_message_makes_no_request() {
    let (server, service) = app().await;

    let response = server.post("/chat/send").form(&[("message", "  ")]).await;

    assert_redirects_home(&response);
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn failed_send_offers_retry() {
    let (server, _service) = app().await;

    server.post("/chat/send").form(&[("message", "fail")]).await;

    let html = server.get("/").await.text();
    assert!(html.contains("Not delivered."));
    assert!(html.contains("action=\"/chat/retry\""));
}

#[tokio::test]
async fn feedback_hides_rating_buttons() {
    let (server, service) = app().await;
    server.post("/chat/send").form(&[("message", "Hi")]).await;

    // Local ids: 1 for the question, 2 for the reply.
    let response = server
        .post("/chat/feedback")
        .form(&[("local_id", "2"), ("positive", "true")])
        .await;
    assert_redirects_home(&response);

    let html = server.get("/").await.text();
    assert!(!html.contains("action=\"/chat/feedback\""));
    assert!(html.contains("Rated helpful"));
    let calls = service.calls_to("POST", "/feedback/");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body["is_positive"], Value::Bool(true));
}

#[tokio::test]
async fn history_panel_lists_and_highlights() {
    let (server, service) = app().await;

    assert_redirects_home(&server.post("/history/toggle").await);
    let html = server.get("/").await.text();
    assert!(html.contains("id=\"history\""));
    assert!(html.contains("Trip planning"));
    assert!(html.contains("2024-05-01 12:30"));
    assert!(html.contains("Untitled conversation"));

    server
        .post("/history/select")
        .form(&[("conversation_id", "1")])
        .await;
    let html = server.get("/").await.text();
    assert!(html.contains("aria-current=\"true\""));
    assert!(html.contains("Tortuga!"));

    assert_redirects_home(&server.post("/history/toggle").await);
    assert!(!server.get("/").await.text().contains("id=\"history\""));
    assert_eq!(service.calls_to("GET", "/conversations/").len(), 1);
}

#[tokio::test]
async fn delete_asks_before_calling_service() {
    let (server, service) = app().await;
    server.post("/history/toggle").await;

    server
        .post("/history/delete")
        .form(&[("conversation_id", "1")])
        .await;
    let html = server.get("/").await.text();
    assert!(html.contains("Delete “Trip planning”?"));
    assert!(service.calls_to("DELETE", "/conversations/1").is_empty());

    assert_redirects_home(&server.post("/history/delete/confirm").await);
    let html = server.get("/").await.text();
    assert!(!html.contains("Trip planning"));
    assert_eq!(service.calls_to("DELETE", "/conversations/1").len(), 1);
}

#[tokio::test]
async fn failed_delete_shows_dismissable_alert() {
    let (server, _service) = app().await;
    server.post("/history/toggle").await;

    server
        .post("/history/delete")
        .form(&[("conversation_id", "locked")])
        .await;
    server.post("/history/delete/confirm").await;
    let html = server.get("/").await.text();
    assert!(html.contains("Could not delete the conversation."));

    server.post("/history/alert/dismiss").await;
    let html = server.get("/").await.text();
    assert!(!html.contains("Could not delete the conversation."));
}

#[tokio::test]
async fn export_redirects_to_service() {
    let (server, service) = app().await;
    let health: Value = server.get("/healthz").await.json();
    let id = health["chat"]["conversation_id"].as_str().unwrap().to_string();

    let response = server.get("/chat/export").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        format!("{}/export-conversation/{id}", service.base_url).as_str()
    );
}

#[tokio::test]
async fn new_conversation_changes_identifier() {
    let (server, service) = app().await;
    let before: Value = server.get("/healthz").await.json();

    assert_redirects_home(&server.post("/chat/new").await);

    let after: Value = server.get("/healthz").await.json();
    assert_eq!(after["status"], "ok");
    assert_ne!(after["chat"]["conversation_id"], before["chat"]["conversation_id"]);
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn clear_adopts_identifier_from_service() {
    let (server, service) = app().await;

    assert_redirects_home(&server.post("/chat/clear").await);

    let health: Value = server.get("/healthz").await.json();
    assert_eq!(health["chat"]["conversation_id"], "srv-fresh");
    assert_eq!(service.calls_to("POST", "/clear-conversation/").len(), 1);
}

#[tokio::test]
async fn system_prompt_editor_saves() {
    let (server, service) = app().await;

    server.post("/chat/system-prompt/toggle").await;
    let html = server.get("/").await.text();
    assert!(html.contains("You are a useful AI assistant."));

    server
        .post("/chat/system-prompt")
        .form(&[("system_prompt", "Be terse.")])
        .await;

    let calls = service.calls_to("POST", "/update-system-message/");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body["system_message"], "Be terse.");
    assert!(!server.get("/").await.text().contains("id=\"system-prompt\""));
}

#[tokio::test]
async fn draft_survives_reload() {
    let (server, _service) = app().await;

    server
        .post("/chat/draft")
        .form(&[("message", "half a thought")])
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(server.get("/").await.text().contains(">half a thought</textarea>"));
}

#[tokio::test]
async fn conversation_link_loads_it() {
    let (server, _service) = app().await;

    assert_redirects_home(&server.get("/conversations/7").await);

    let health: Value = server.get("/healthz").await.json();
    assert_eq!(health["chat"]["conversation_id"], "7");
    assert_eq!(health["chat"]["messages"], 2);
}

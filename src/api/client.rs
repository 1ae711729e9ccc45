//! HTTP client for the chat service.

use async_trait::async_trait;
use url::Url;

use crate::config::{ApiConfig, Endpoints};

use super::error::{ApiError, Result};
use super::types::{
    ClearConversationResponse, ConversationSummary, FeedbackRequest, MessageId, MessageRecord,
    Role, SendMessageRequest, SendMessageResponse, SystemMessageRequest,
};

/// Operations the UI needs from the chat service.
///
/// The controller only talks to this trait, so tests can swap in a mock.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// List all saved conversations.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Fetch the stored messages of a conversation, oldest first.
    async fn conversation_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>>;

    /// Delete a saved conversation.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;

    /// Submit a user message and wait for the assistant reply.
    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<SendMessageResponse>;

    /// Ask the service to retire a conversation. Returns the identifier to use next.
    async fn clear_conversation(&self, conversation_id: &str) -> Result<ClearConversationResponse>;

    /// Rate an assistant message.
    async fn send_feedback(
        &self,
        conversation_id: &str,
        message_id: &MessageId,
        is_positive: bool,
    ) -> Result<()>;

    /// Replace the system prompt of a conversation.
    async fn update_system_message(&self, conversation_id: &str, system_message: &str)
    -> Result<()>;

    /// Location of the transcript download. Building it performs no request.
    fn export_url(&self, conversation_id: &str) -> Result<Url>;
}

/// reqwest-backed [`ChatBackend`].
///
/// # Example
///
/// ```rust,no_run
/// use orito_chat::api::{ApiClient, ChatBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new("http://localhost:8000")?;
/// for conversation in client.list_conversations().await? {
///     println!("{} {}", conversation.id, conversation.display_title());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    endpoints: Endpoints,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client with the default endpoint layout.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, Endpoints::default(), reqwest::Client::new())
    }

    /// Create a client from the `[api]` configuration section.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self::with_client(&config.base_url, config.endpoints.clone(), builder.build()?)
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(
        base_url: impl AsRef<str>,
        endpoints: Endpoints,
        http: reqwest::Client,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref().trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::CannotBeABase(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            endpoints,
            http,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve an endpoint template against the base URL.
    ///
    /// Segments are appended one by one so an identifier can never inject a
    /// path separator or query string.
    fn url(&self, template: &str, conversation_id: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::CannotBeABase(self.base_url.to_string()))?;
            segments.pop_if_empty();
            for segment in template.trim_start_matches('/').split('/') {
                if segment == "{id}" {
                    segments.push(conversation_id.unwrap_or_default());
                } else {
                    segments.push(segment);
                }
            }
        }
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(ApiError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let url = self.url(&self.endpoints.conversations, None)?;
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    async fn conversation_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        let url = self.url(&self.endpoints.conversation_messages, Some(conversation_id))?;
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = self.url(&self.endpoints.conversation, Some(conversation_id))?;
        let response = self.http.delete(url).send().await?;
        Self::check_status(response).await.map(drop)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<SendMessageResponse> {
        let req = SendMessageRequest {
            message,
            role: Role::User,
            conversation_id,
        };
        let url = self.url(&self.endpoints.chat, None)?;
        let response = self.http.post(url).json(&req).send().await?;
        Self::handle_response(response).await
    }

    async fn clear_conversation(&self, conversation_id: &str) -> Result<ClearConversationResponse> {
        let mut url = self.url(&self.endpoints.clear_conversation, None)?;
        url.query_pairs_mut()
            .append_pair("conversation_id", conversation_id);
        let response = self.http.post(url).send().await?;
        Self::handle_response(response).await
    }

    async fn send_feedback(
        &self,
        conversation_id: &str,
        message_id: &MessageId,
        is_positive: bool,
    ) -> Result<()> {
        let req = FeedbackRequest {
            conversation_id,
            message_id,
            is_positive,
        };
        let url = self.url(&self.endpoints.feedback, None)?;
        let response = self.http.post(url).json(&req).send().await?;
        Self::check_status(response).await.map(drop)
    }

    async fn update_system_message(
        &self,
        conversation_id: &str,
        system_message: &str,
    ) -> Result<()> {
        let req = SystemMessageRequest {
            conversation_id,
            system_message,
        };
        let url = self.url(&self.endpoints.system_message, None)?;
        let response = self.http.post(url).json(&req).send().await?;
        Self::check_status(response).await.map(drop)
    }

    fn export_url(&self, conversation_id: &str) -> Result<Url> {
        self.url(&self.endpoints.export, Some(conversation_id))
    }
}

/// File name the service suggests for an exported transcript.
pub fn export_file_name(conversation_id: &str) -> String {
    format!("conversation_{conversation_id}.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_templates_resolve_against_root_base() {
        let client = ApiClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.url("/chat/", None).unwrap().as_str(),
            "http://localhost:8000/chat/"
        );
        assert_eq!(
            client
                .url("/conversations/{id}/messages", Some("171"))
                .unwrap()
                .as_str(),
            "http://localhost:8000/conversations/171/messages"
        );
    }

    #[test]
    fn endpoint_templates_keep_base_path_prefix() {
        let client = ApiClient::new("http://example.test/api/").unwrap();
        assert_eq!(
            client.export_url("9").unwrap().as_str(),
            "http://example.test/api/export-conversation/9"
        );
    }

    #[test]
    fn identifiers_are_encoded_as_single_segment() {
        let client = ApiClient::new("http://localhost:8000").unwrap();
        let url = client.url("/conversations/{id}", Some("a/b?c")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/conversations/a%2Fb%3Fc");
    }

    #[test]
    fn rejects_non_hierarchical_base() {
        assert!(matches!(
            ApiClient::new("mailto:someone@example.test"),
            Err(ApiError::CannotBeABase(_))
        ));
    }

    #[test]
    fn export_file_name_follows_service_convention() {
        assert_eq!(export_file_name("42"), "conversation_42.txt");
    }
}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::models::*;
use crate::providers::traits::CompletionProvider;
use crate::providers::types::{ChatMessage, ChatRequest, ChatResponse, ProviderError};

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiProvider {
    client: Client,
    endpoint: Url,
}

impl OpenAiProvider {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    fn build_messages(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: msg.role.as_str().to_string(),
                content: Some(msg.content.clone()),
            })
            .collect()
    }

    fn build_auth_header(api_key: &str) -> Option<String> {
        if api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", api_key))
        }
    }

    fn parse_error_message(status: StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }

    /// First choice's content, or an empty string when the shape is unexpected.
    pub(crate) fn answer_from(response: &OpenAiResponse) -> String {
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let openai_request = OpenAiRequest {
            model: request.model.clone(),
            messages: Self::build_messages(&request.messages),
        };

        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(&openai_request);

        if let Some(auth) = Self::build_auth_header(&request.api_key) {
            req = req.header("Authorization", auth);
        }

        tracing::debug!(endpoint = %self.endpoint, model = %request.model, "Sending completion request");

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthError("Invalid API key".to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(Self::parse_error_message(
                status, &body,
            )));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = Self::answer_from(&openai_response);
        if content.is_empty() {
            tracing::warn!("Completion response carried no content, storing an empty answer");
        }

        let (tokens_in, tokens_out) = openai_response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((None, None));

        Ok(ChatResponse {
            content,
            model: openai_response.model.unwrap_or(request.model),
            tokens_in,
            tokens_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::openai::stub::StubServer;

    fn request(question: &str) -> ChatRequest {
        ChatRequest {
            api_key: "sk-test".to_string(),
            model: "o4-mini".to_string(),
            messages: vec![ChatMessage::user(question)],
        }
    }

    #[test]
    fn answer_defaults_to_empty_when_content_missing() {
        let parsed: OpenAiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert_eq!(OpenAiProvider::answer_from(&parsed), "");

        let parsed: OpenAiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(OpenAiProvider::answer_from(&parsed), "");

        let parsed: OpenAiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(OpenAiProvider::answer_from(&parsed), "");
    }

    #[test]
    fn error_message_prefers_provider_detail() {
        let msg = OpenAiProvider::parse_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"model not found"}}"#,
        );
        assert_eq!(msg, "HTTP 400: model not found");

        let msg = OpenAiProvider::parse_error_message(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(msg, "HTTP 502: Request failed");
    }

    #[tokio::test]
    async fn sends_bearer_token_and_single_user_message() {
        let server = StubServer::start(200, r#"{"choices":[{"message":{"content":"4"}}]}"#).await;
        let provider = OpenAiProvider::new(server.url());

        let response = provider.complete(request("2+2?")).await.unwrap();
        assert_eq!(response.content, "4");
        assert_eq!(response.model, "o4-mini");

        let captured = server.requests();
        assert_eq!(captured.len(), 1);
        let sent = &captured[0];
        assert!(sent.head.starts_with("POST /v1/chat/completions"));
        assert!(sent
            .head
            .to_lowercase()
            .contains("authorization: bearer sk-test"));

        let body: serde_json::Value = serde_json::from_str(&sent.body).unwrap();
        assert_eq!(body["model"], "o4-mini");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "2+2?");
    }

    #[tokio::test]
    async fn empty_api_key_sends_no_authorization_header() {
        let server = StubServer::start(200, r#"{"choices":[{"message":{"content":"ok"}}]}"#).await;
        let provider = OpenAiProvider::new(server.url());

        let mut req = request("hi");
        req.api_key.clear();
        provider.complete(req).await.unwrap();

        let captured = server.requests();
        assert!(!captured[0].head.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn server_error_maps_to_request_failed() {
        let server = StubServer::start(500, r#"{"error":{"message":"boom"}}"#).await;
        let provider = OpenAiProvider::new(server.url());

        let err = provider.complete(request("2+2?")).await.unwrap_err();
        match err {
            ProviderError::RequestFailed(msg) => assert_eq!(msg, "HTTP 500: boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = StubServer::start(401, r#"{"error":{"message":"bad key"}}"#).await;
        let provider = OpenAiProvider::new(server.url());

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthError(_)));
    }

    #[tokio::test]
    async fn too_many_requests_reads_retry_after() {
        let server = StubServer::start_with_headers(
            429,
            &[("Retry-After", "7")],
            r#"{"error":{"message":"slow down"}}"#,
        )
        .await;
        let provider = OpenAiProvider::new(server.url());

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: Some(7)
            }
        ));
    }

    #[tokio::test]
    async fn too_many_requests_without_usable_retry_after() {
        let server = StubServer::start_with_headers(
            429,
            &[("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT")],
            "{}",
        )
        .await;
        let provider = OpenAiProvider::new(server.url());

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: None
            }
        ));
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_response() {
        let server = StubServer::start(200, "not json").await;
        let provider = OpenAiProvider::new(server.url());

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/v1/chat/completions", addr)).unwrap();
        let provider = OpenAiProvider::new(url);

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NetworkError(_)));
    }
}

//! Anthropic LLM provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::{DEFAULT_REQUEST_TIMEOUT, build_http_client};
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, TokenUsage,
};
use crate::llm::retry::response_to_error;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Anthropic client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: ANTHROPIC_API_BASE.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicResponseContent {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let messages = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "Anthropic").await);
        }

        let data: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidFormat(format!("Anthropic response: {}", e)))?;

        let content = data
            .content
            .into_iter()
            .find(|block| block.r#type == "text")
            .and_then(|block| block.text);

        let finish_reason = match data.stop_reason.as_deref() {
            Some("max_tokens") => FinishReason::MaxTokens,
            _ => FinishReason::Stop,
        };

        Ok(CompletionResponse {
            content,
            finish_reason,
            usage: data.usage.map(|usage| TokenUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new("test-key").with_base_url(server.uri())
    }

    #[test]
    fn test_defaults() {
        let client = AnthropicClient::new("key");
        assert_eq!(client.provider(), "anthropic");
        assert_eq!(client.model(), "claude-3-haiku-20240307");
        assert_eq!(client.messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = AnthropicClient::new("key").with_base_url("http://localhost:9000/");
        assert_eq!(client.messages_url(), "http://localhost:9000/v1/messages");
    }

    #[tokio::test]
    async fn test_complete_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 1000,
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "how are you?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Doing well!"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 15, "output_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = CompletionRequest::new(vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("how are you?"),
        ])
        .with_max_tokens(1000)
        .with_temperature(0.7);

        let response = client_for(&server).complete(request).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("Doing well!"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                input_tokens: 15,
                output_tokens: 4
            })
        );
    }

    #[tokio::test]
    async fn test_complete_takes_first_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "first"},
                    {"type": "text", "text": "second"}
                ],
                "stop_reason": "max_tokens",
                "usage": {"input_tokens": 1, "output_tokens": 1}
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("q")]))
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("first"));
        assert_eq!(response.finish_reason, FinishReason::MaxTokens);
    }

    #[tokio::test]
    async fn test_complete_without_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("q")]))
            .await
            .unwrap();

        assert!(response.content.is_none());
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_complete_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(529)
                    .insert_header("retry-after", "3")
                    .set_body_string("overloaded"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("q")]))
            .await
            .unwrap_err();

        match &err {
            AiError::LlmHttp {
                provider,
                status,
                message,
                retry_after_secs,
            } => {
                assert_eq!(provider, "Anthropic");
                assert_eq!(*status, 529);
                assert_eq!(message, "overloaded");
                assert_eq!(*retry_after_secs, Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_complete_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new(vec![Message::user("q")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::InvalidFormat(_)));
        assert!(!err.is_retryable());
    }
}

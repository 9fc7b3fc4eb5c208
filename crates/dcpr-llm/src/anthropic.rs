use async_trait::async_trait;
use dcpr_core::models::Role;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{ChatError, ChatModel, ChatRequest};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API chat model
pub struct AnthropicChat {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicChat {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, model, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait]
impl ChatModel for AnthropicChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let body = MessagesRequest {
            model: &self.model,
            system: &request.system,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: request
                .messages
                .iter()
                .map(|turn| Message {
                    role: match turn.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: &turn.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::transient(format!("Failed to reach Anthropic API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<ErrorEnvelope>(&error_text) {
                Ok(envelope) => format!(
                    "Anthropic API error ({}): {}: {}",
                    status, envelope.error.kind, envelope.error.message
                ),
                Err(_) => format!("Anthropic API error ({}): {}", status, error_text),
            };

            // 429 and 529 (overloaded) clear up on their own.
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                ChatError::transient(reason)
            } else {
                ChatError::permanent(reason)
            });
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ChatError::permanent(format!("Malformed Anthropic response: {}", e)))?;

        let text = messages_response.text();
        if text.is_empty() {
            tracing::warn!(
                model = %self.model,
                stop_reason = ?messages_response.stop_reason,
                "Anthropic response carried no text content"
            );
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpr_core::models::Turn;
    use mockito::Matcher;

    fn chat(server: &mockito::ServerGuard) -> AnthropicChat {
        AnthropicChat::with_base_url(server.url(), "test-key", "claude-test", Duration::from_secs(5))
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Base FSI "},{"type":"tool_use","id":"x","name":"n","input":{}},{"type":"text","text":"is 1.33"}],"stop_reason":"end_turn"}"#,
        )
        .unwrap();

        assert_eq!(response.text(), "Base FSI is 1.33");
    }

    #[tokio::test]
    async fn test_complete_sends_headers_and_system() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", API_VERSION)
            .match_body(Matcher::PartialJsonString(
                r#"{"model":"claude-test","system":"be precise","temperature":0.0,"messages":[{"role":"user","content":"hi"}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"hello"}],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let reply = chat(&server)
            .complete(&ChatRequest::new("be precise", vec![Turn::user("hi")]))
            .await
            .unwrap();

        assert_eq!(reply, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_body(r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#)
            .create_async()
            .await;

        let err = chat(&server)
            .complete(&ChatRequest::new("s", vec![Turn::user("q")]))
            .await
            .unwrap_err();

        assert!(err.transient);
        assert!(err.reason.contains("rate_limit_error"));
    }

    #[tokio::test]
    async fn test_bad_request_is_permanent() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(400)
            .with_body(r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#)
            .create_async()
            .await;

        let err = chat(&server)
            .complete(&ChatRequest::new("s", vec![Turn::user("q")]))
            .await
            .unwrap_err();

        assert!(!err.transient);
    }
}

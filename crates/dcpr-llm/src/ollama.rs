use async_trait::async_trait;
use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::Role;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{ChatError, ChatModel, ChatRequest, Embedder};

/// Ollama embedder implementation
pub struct OllamaEmbedder {
    /// Base URL for Ollama API (e.g., "http://localhost:11434")
    base_url: String,

    /// Model name to use for embeddings
    model: String,

    /// Embedding dimensions (model-specific)
    dimensions: usize,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
            client: reqwest::Client::new(),
        }
    }

    /// Create with default localhost URL
    pub fn localhost(model: impl Into<String>, dimensions: usize) -> Self {
        Self::new("http://localhost:11434", model, dimensions)
    }

    fn unavailable(&self, reason: String) -> DcprError {
        DcprError::EmbedderUnavailable {
            reason,
            remediation: format!(
                "Ensure Ollama is running at {} and the model '{}' is available. \
                 Run 'ollama pull {}' to download the model.",
                self.base_url, self.model, self.model
            ),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OllamaEmbedRequest {
            model: &self.model,
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("Failed to connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("Ollama API error ({}): {}", status, error_text)));
        }

        let embed_response: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("Failed to parse Ollama response: {}", e)))?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(self.unavailable(format!(
                "Expected {} embeddings, Ollama returned {}",
                texts.len(),
                embed_response.embeddings.len()
            )));
        }

        if let Some(bad) = embed_response.embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(DcprError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        Ok(embed_response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama embed API
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response from Ollama embed API
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama chat model implementation
pub struct OllamaChat {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn complete(&self, request: &ChatRequest) -> std::result::Result<String, ChatError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(OllamaMessage { role: "system", content: &request.system });
        messages.extend(request.messages.iter().map(|turn| OllamaMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &turn.content,
        }));

        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::transient(format!("Failed to reach Ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let reason = format!("Ollama chat error ({}): {}", status, error_text);
            return Err(if status.is_server_error() {
                ChatError::transient(reason)
            } else {
                ChatError::permanent(reason)
            });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::permanent(format!("Malformed Ollama chat response: {}", e)))?;

        Ok(chat_response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpr_core::models::Turn;

    #[test]
    fn test_ollama_embedder_creation() {
        let embedder = OllamaEmbedder::localhost("nomic-embed-text", 768);
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        assert_eq!(embedder.dimensions(), 768);
    }

    #[test]
    fn test_ollama_embedder_custom_url() {
        let embedder = OllamaEmbedder::new("http://custom:11434/", "test-model", 512);
        assert_eq!(embedder.base_url, "http://custom:11434");
        assert_eq!(embedder.model_name(), "test-model");
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"m","embeddings":[[0.1,0.2,0.3],[0.4,0.5,0.6]]}"#)
            .create_async()
            .await;

        let embedder = OllamaEmbedder::new(server.url(), "m", 3);
        let vectors = embedder.embed(&["a", "b"]).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_dimension_mismatch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(200)
            .with_body(r#"{"embeddings":[[0.1,0.2]]}"#)
            .create_async()
            .await;

        let embedder = OllamaEmbedder::new(server.url(), "m", 3);
        let err = embedder.embed(&["a"]).await.unwrap_err();

        assert!(matches!(err, DcprError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn test_embed_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(404)
            .with_body("model not found")
            .create_async()
            .await;

        let embedder = OllamaEmbedder::new(server.url(), "missing", 3);
        let err = embedder.embed(&["a"]).await.unwrap_err();

        assert!(matches!(err, DcprError::EmbedderUnavailable { .. }));
        assert!(err.to_string().contains("ollama pull missing"));
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"stream":false,"options":{"temperature":0.0}}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"message":{"role":"assistant","content":"Base FSI is 1.0"},"done":true}"#)
            .create_async()
            .await;

        let chat = OllamaChat::new(server.url(), "llama3.1", Duration::from_secs(5));
        let request = ChatRequest::new("system", vec![Turn::user("What is the base FSI?")]);

        assert_eq!(chat.complete(&request).await.unwrap(), "Base FSI is 1.0");
    }

    #[tokio::test]
    async fn test_chat_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/api/chat").with_status(503).create_async().await;

        let chat = OllamaChat::new(server.url(), "llama3.1", Duration::from_secs(5));
        let err = chat.complete(&ChatRequest::new("s", vec![Turn::user("q")])).await.unwrap_err();

        assert!(err.transient);
    }
}

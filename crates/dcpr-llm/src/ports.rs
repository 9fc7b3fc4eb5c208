//! LLM port definitions

use async_trait::async_trait;
use dcpr_core::error::Result;
use dcpr_core::models::Turn;
use std::sync::Arc;
use thiserror::Error;

/// Port for embedding text into vector representations.
///
/// The same model must embed the corpus and the queries; the index records
/// `model_name` and `dimensions` to enforce that.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a batch of texts
    ///
    /// # Returns
    /// Vector of embedding vectors, one per input text
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get the dimensionality of embeddings produced by this embedder
    fn dimensions(&self) -> usize;

    /// Get the name/identifier of the embedding model
    fn model_name(&self) -> &str;
}

/// A chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// System instruction
    pub system: String,

    /// Prior conversation followed by the current user message
    pub messages: Vec<Turn>,

    /// Sampling temperature, 0 for reproducible output
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, messages: Vec<Turn>) -> Self {
        Self {
            system: system.into(),
            messages,
            temperature: 0.0,
            max_tokens: 2048,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Failure of a chat completion call
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct ChatError {
    pub reason: String,

    /// Network errors, timeouts, rate limits and server errors
    pub transient: bool,
}

impl ChatError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self { reason: reason.into(), transient: true }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self { reason: reason.into(), transient: false }
    }
}

/// Port for text generation
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the assistant reply for a request
    async fn complete(&self, request: &ChatRequest) -> std::result::Result<String, ChatError>;

    fn model_name(&self) -> &str;
}

/// Port for joint query-passage relevance scoring
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score each passage against the query, one score per passage in input order
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts).await
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    async fn complete(&self, request: &ChatRequest) -> std::result::Result<String, ChatError> {
        (**self).complete(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[async_trait]
impl<T: CrossEncoder + ?Sized> CrossEncoder for Arc<T> {
    async fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        (**self).score(query, passages).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

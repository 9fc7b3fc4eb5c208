//! DCPR LLM - Embedding, chat and cross-encoder ports
//!
//! This crate defines the model-facing ports used by retrieval, along with
//! HTTP adapter implementations for Ollama, Anthropic and text-embeddings-inference
//! style rerank servers.

pub mod anthropic;
pub mod cross_encoder;
pub mod factory;
pub mod ollama;
pub mod ports;

// Re-export main types
pub use anthropic::AnthropicChat;
pub use cross_encoder::HttpCrossEncoder;
pub use factory::{chat_model_from_config, cross_encoder_from_config, embedder_from_config};
pub use ollama::{OllamaChat, OllamaEmbedder};
pub use ports::{ChatError, ChatModel, ChatRequest, CrossEncoder, Embedder};

//! Construct adapters from layered configuration

use dcpr_core::config::{parse_model_spec, LayeredConfig, Provider};
use dcpr_core::error::{DcprError, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::anthropic::AnthropicChat;
use crate::cross_encoder::HttpCrossEncoder;
use crate::ollama::{OllamaChat, OllamaEmbedder};
use crate::ports::{ChatModel, CrossEncoder, Embedder};

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Build the configured embedder
pub fn embedder_from_config(config: &LayeredConfig) -> Result<Arc<dyn Embedder>> {
    let spec = parse_model_spec(&config.embedder.value)?;

    match spec.provider {
        Provider::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            config.ollama_url.value.clone(),
            spec.model,
            config.embedding_dim.value,
        ))),
        Provider::Anthropic => Err(DcprError::ConfigInvalid {
            key: "embedder".to_string(),
            reason: "Anthropic does not provide embeddings. Use an ollama model".to_string(),
        }),
    }
}

/// Build the configured chat model
pub fn chat_model_from_config(config: &LayeredConfig) -> Result<Arc<dyn ChatModel>> {
    let spec = parse_model_spec(&config.llm.value)?;
    let timeout = Duration::from_secs(config.llm_timeout_secs.value);

    match spec.provider {
        Provider::Ollama => Ok(Arc::new(OllamaChat::new(
            config.ollama_url.value.clone(),
            spec.model,
            timeout,
        ))),
        Provider::Anthropic => {
            let api_key = std::env::var(ANTHROPIC_API_KEY)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| DcprError::ConfigMissing { key: ANTHROPIC_API_KEY.to_string() })?;

            Ok(Arc::new(AnthropicChat::new(api_key, spec.model, timeout)))
        }
    }
}

/// Build the configured cross-encoder
pub fn cross_encoder_from_config(config: &LayeredConfig) -> Arc<dyn CrossEncoder> {
    Arc::new(HttpCrossEncoder::new(
        config.reranker_url.value.clone(),
        config.reranker_model.value.clone(),
    ))
}

use dcpr_core::error::{GenerationStage, Result};
use dcpr_core::models::Turn;
use dcpr_llm::ports::{ChatModel, ChatRequest};
use std::time::Duration;

use crate::prompts::CONTEXTUALIZE_SYSTEM_PROMPT;
use crate::stages::{complete_within, DEFAULT_STAGE_TIMEOUT};

/// History Contextualizer
pub struct HistoryContextualizer<M: ChatModel> {
    model: M,
    timeout: Duration,
}

impl<M: ChatModel> HistoryContextualizer<M> {
    pub fn new(model: M) -> Self {
        Self { model, timeout: DEFAULT_STAGE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rewrite `question` so it can be understood without `history`.
    ///
    /// With no history the question is returned unchanged and the model is not
    /// called. An empty rewrite also falls back to the question.
    pub async fn contextualize(&self, question: &str, history: &[Turn]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let mut messages = history.to_vec();
        messages.push(Turn::user(question));

        let request = ChatRequest::new(CONTEXTUALIZE_SYSTEM_PROMPT, messages).with_max_tokens(512);
        let response =
            complete_within(&self.model, &request, GenerationStage::Contextualize, self.timeout)
                .await?;

        let standalone = response.trim();
        if standalone.is_empty() {
            tracing::debug!("Empty contextualization, keeping original question");
            return Ok(question.to_string());
        }

        tracing::debug!(original = question, standalone, turns = history.len(), "Question contextualized");
        Ok(standalone.to_string())
    }
}

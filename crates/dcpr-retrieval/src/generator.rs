use dcpr_core::error::{GenerationStage, Result};
use dcpr_core::models::Turn;
use dcpr_llm::ports::{ChatModel, ChatRequest};
use std::time::Duration;

use crate::models::RankedPassage;
use crate::prompts::{answer_system_prompt, format_context};
use crate::stages::{complete_within, DEFAULT_STAGE_TIMEOUT};

const ANSWER_MAX_TOKENS: u32 = 4096;

/// Answer Generator
///
/// Produces text only; persisting the turn is the caller's job.
pub struct AnswerGenerator<M: ChatModel> {
    model: M,
    timeout: Duration,
}

impl<M: ChatModel> AnswerGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model, timeout: DEFAULT_STAGE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Answer `question` grounded in `passages`.
    ///
    /// An empty passage list is still sent to the model, whose instructions
    /// tell it to report insufficient context.
    pub async fn generate(
        &self,
        question: &str,
        history: &[Turn],
        passages: &[RankedPassage],
    ) -> Result<String> {
        let context = format_context(passages);

        let mut messages = history.to_vec();
        messages.push(Turn::user(question));

        let request = ChatRequest::new(answer_system_prompt(&context), messages)
            .with_max_tokens(ANSWER_MAX_TOKENS);

        let answer =
            complete_within(&self.model, &request, GenerationStage::Answer, self.timeout).await?;

        tracing::debug!(
            passages = passages.len(),
            context_chars = context.len(),
            answer_chars = answer.len(),
            "Answer generated"
        );

        Ok(answer.trim().to_string())
    }
}

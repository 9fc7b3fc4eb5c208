//! The generative stages of the pipeline behind one capability seam.
//!
//! [`LanguageStages`] is what the pipeline calls for contextualization,
//! query construction and answer generation. [`LlmStages`] implements it with
//! a chat model; tests substitute deterministic stubs.

use async_trait::async_trait;
use dcpr_core::error::{DcprError, GenerationStage, Result};
use dcpr_core::models::Turn;
use dcpr_core::schema::MetadataSchema;
use dcpr_llm::ports::{ChatModel, ChatRequest};
use std::sync::Arc;
use std::time::Duration;

use crate::contextualizer::HistoryContextualizer;
use crate::generator::AnswerGenerator;
use crate::models::RankedPassage;
use crate::query_constructor::{ConstructedQuery, QueryConstructor};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Capability interface over the model-driven stages
#[async_trait]
pub trait LanguageStages: Send + Sync {
    /// Rewrite a follow-up into a standalone question
    async fn contextualize(&self, question: &str, history: &[Turn]) -> Result<String>;

    /// Split a question into search text and a metadata filter
    async fn construct_query(&self, question: &str) -> Result<ConstructedQuery>;

    /// Answer from the given passages
    async fn generate(
        &self,
        question: &str,
        history: &[Turn],
        passages: &[RankedPassage],
    ) -> Result<String>;
}

#[async_trait]
impl<T: LanguageStages + ?Sized> LanguageStages for Arc<T> {
    async fn contextualize(&self, question: &str, history: &[Turn]) -> Result<String> {
        (**self).contextualize(question, history).await
    }

    async fn construct_query(&self, question: &str) -> Result<ConstructedQuery> {
        (**self).construct_query(question).await
    }

    async fn generate(
        &self,
        question: &str,
        history: &[Turn],
        passages: &[RankedPassage],
    ) -> Result<String> {
        (**self).generate(question, history, passages).await
    }
}

/// [`LanguageStages`] backed by a chat model
pub struct LlmStages<M: ChatModel + Clone> {
    contextualizer: HistoryContextualizer<M>,
    constructor: QueryConstructor<M>,
    generator: AnswerGenerator<M>,
}

impl<M: ChatModel + Clone> LlmStages<M> {
    pub fn new(model: M, schema: MetadataSchema) -> Self {
        Self::with_timeout(model, schema, DEFAULT_STAGE_TIMEOUT)
    }

    /// Bound every model call by `timeout`
    pub fn with_timeout(model: M, schema: MetadataSchema, timeout: Duration) -> Self {
        Self {
            contextualizer: HistoryContextualizer::new(model.clone()).with_timeout(timeout),
            constructor: QueryConstructor::new(model.clone(), schema).with_timeout(timeout),
            generator: AnswerGenerator::new(model).with_timeout(timeout),
        }
    }
}

#[async_trait]
impl<M: ChatModel + Clone> LanguageStages for LlmStages<M> {
    async fn contextualize(&self, question: &str, history: &[Turn]) -> Result<String> {
        self.contextualizer.contextualize(question, history).await
    }

    async fn construct_query(&self, question: &str) -> Result<ConstructedQuery> {
        self.constructor.construct(question).await
    }

    async fn generate(
        &self,
        question: &str,
        history: &[Turn],
        passages: &[RankedPassage],
    ) -> Result<String> {
        self.generator.generate(question, history, passages).await
    }
}

/// Run one model call under a timeout, attributing failures to `stage`.
///
/// A timeout is a transient generation failure.
pub(crate) async fn complete_within<M: ChatModel + ?Sized>(
    model: &M,
    request: &ChatRequest,
    stage: GenerationStage,
    timeout: Duration,
) -> Result<String> {
    let started = std::time::Instant::now();

    let outcome = tokio::time::timeout(timeout, model.complete(request)).await;

    match outcome {
        Ok(Ok(text)) => {
            tracing::debug!(
                %stage,
                model = model.model_name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Model call complete"
            );
            Ok(text)
        }
        Ok(Err(e)) => {
            tracing::warn!(%stage, transient = e.transient, error = %e.reason, "Model call failed");
            Err(DcprError::generation(stage, e.reason, e.transient))
        }
        Err(_) => {
            tracing::warn!(%stage, timeout_secs = timeout.as_secs_f64(), "Model call timed out");
            Err(DcprError::generation(
                stage,
                format!("model call timed out after {:.1}s", timeout.as_secs_f64()),
                true,
            ))
        }
    }
}

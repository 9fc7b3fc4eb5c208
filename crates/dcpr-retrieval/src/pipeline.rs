use dcpr_core::config::LayeredConfig;
use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::{Predicate, StructuredQuery, Turn};
use dcpr_core::schema::MetadataSchema;
use dcpr_llm::factory::{chat_model_from_config, cross_encoder_from_config, embedder_from_config};
use dcpr_llm::ports::{ChatModel, CrossEncoder, Embedder};
use dcpr_store::ports::VectorIndex;
use dcpr_store::{load_index, SharedIndex};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::RetrievalResult;
use crate::reranker::Reranker;
use crate::stages::{LanguageStages, LlmStages};
use crate::translator::QueryTranslator;

/// Search widths for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Candidates fetched by similarity search before reranking
    pub candidate_k: usize,

    /// Passages kept after reranking
    pub top_n: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { candidate_k: 28, top_n: 7 }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            candidate_k: config.candidate_k.value,
            top_n: config.top_n.value,
        }
    }
}

/// Retrieval pipeline orchestrating contextualization, self-querying,
/// filtered search, reranking and answer generation
pub struct RetrievalPipeline<L, E, V, C>
where
    L: LanguageStages,
    E: Embedder,
    V: VectorIndex,
    C: CrossEncoder,
{
    stages: L,
    embedder: E,
    index: V,
    reranker: Reranker<C>,
    translator: QueryTranslator,
    settings: PipelineSettings,
}

impl<L, E, V, C> RetrievalPipeline<L, E, V, C>
where
    L: LanguageStages,
    E: Embedder,
    V: VectorIndex,
    C: CrossEncoder,
{
    /// Create a new retrieval pipeline
    pub fn new(
        stages: L,
        embedder: E,
        index: V,
        encoder: C,
        schema: MetadataSchema,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            stages,
            embedder,
            index,
            reranker: Reranker::new(encoder),
            translator: QueryTranslator::new(schema),
            settings,
        }
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    /// Answer `question` in the context of `history`.
    ///
    /// Stages run in a fixed order: contextualize, construct the structured
    /// query, embed the search text, translate the filter, search, rerank,
    /// generate. Unusable filter fragments are dropped along the way and
    /// reported in the result; an empty retrieval still reaches the generator.
    pub async fn answer_question(&self, question: &str, history: &[Turn]) -> Result<RetrievalResult> {
        let started = Instant::now();

        // Stage 1: History contextualization
        let standalone_question = self.stages.contextualize(question, history).await?;

        // Stage 2: Structured query construction
        let constructed = self.stages.construct_query(&standalone_question).await?;
        let mut rejected = constructed.rejected;
        let StructuredQuery { search_text, filter } = constructed.query;

        // Stage 3: Embed the search text
        let query_embedding = self.embed_query(&search_text).await?;

        // Stage 4: Filter translation
        let (filter, pruned) = self.translator.sanitize(filter);
        rejected.extend(pruned);
        let predicate = match self.translator.translate(filter.as_ref()) {
            Ok(predicate) => predicate,
            Err(rejection) => {
                tracing::warn!(%rejection, "Sanitized filter still untranslatable, searching unfiltered");
                rejected.push(rejection);
                Predicate::Always
            }
        };

        // Stage 5: Candidate retrieval
        let candidates = self
            .index
            .search(&query_embedding, &predicate, self.settings.candidate_k)
            .await?;
        let candidates_considered = candidates.len();

        // Stage 6: Reranking
        let passages_used = self
            .reranker
            .rerank(&standalone_question, candidates, self.settings.top_n)
            .await?;

        if passages_used.is_empty() {
            tracing::info!(search_text = %search_text, "No passages survived filtering and search");
        }

        // Stage 7: Answer generation
        let answer = self.stages.generate(&standalone_question, history, &passages_used).await?;

        tracing::info!(
            candidates = candidates_considered,
            passages = passages_used.len(),
            filtered = filter.is_some(),
            rejected = rejected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(RetrievalResult {
            answer,
            passages_used,
            standalone_question,
            structured_query: StructuredQuery { search_text, filter },
            rejected,
            candidates_considered,
        })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embedder.embed(&[text]).await?;
        embeddings.into_iter().next().ok_or_else(|| DcprError::EmbedderUnavailable {
            reason: "Failed to generate query embedding".to_string(),
            remediation: format!("Check the embedder '{}'", self.embedder.model_name()),
        })
    }
}

/// Pipeline wired to the configured model servers and the persisted index
pub type ConfiguredPipeline = RetrievalPipeline<
    Arc<dyn LanguageStages>,
    Arc<dyn Embedder>,
    SharedIndex,
    Arc<dyn CrossEncoder>,
>;

impl ConfiguredPipeline {
    /// Build the adapters named by `config` and load the index it points at.
    ///
    /// Fails with `IndexUnavailable` when no index has been ingested and with
    /// `EmbedderMismatch` when the index was built by a different embedder.
    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        let embedder = embedder_from_config(config)?;
        let index = load_index(&config.index_path.value, embedder.model_name())?;
        let chat = chat_model_from_config(config)?;
        let encoder = cross_encoder_from_config(config);
        let schema = MetadataSchema::dcpr();

        tracing::info!(
            index = %config.index_path.value.display(),
            passages = index.len(),
            embedder = embedder.model_name(),
            llm = chat.model_name(),
            reranker = encoder.model_name(),
            "Retrieval pipeline ready"
        );

        let stages: Arc<dyn LanguageStages> = Arc::new(LlmStages::with_timeout(
            chat,
            schema.clone(),
            Duration::from_secs(config.llm_timeout_secs.value),
        ));

        Ok(Self::new(
            stages,
            embedder,
            SharedIndex::new(index),
            encoder,
            schema,
            PipelineSettings::from_config(config),
        ))
    }
}

//! DCPR Retrieval - Query understanding, search, reranking and answering
//!
//! This crate implements the retrieval core: history contextualization,
//! self-querying into a structured query, filter translation, filtered
//! similarity search, cross-encoder reranking and grounded answer generation,
//! composed by [`RetrievalPipeline`]. Conversations live in an explicit
//! [`SessionStore`].

pub mod contextualizer;
pub mod generator;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod query_constructor;
pub mod reranker;
pub mod session;
pub mod stages;
pub mod translator;

pub use index::{IndexBuildResult, IndexBuilder, IndexPhase, IndexProgress};
pub use models::{CitedSource, RankedPassage, RetrievalResult, TranscriptEntry};
pub use pipeline::{ConfiguredPipeline, PipelineSettings, RetrievalPipeline};
pub use reranker::Reranker;
pub use session::{SessionId, SessionStore, SessionSummary};
pub use stages::{LanguageStages, LlmStages};
pub use translator::QueryTranslator;

use chrono::{DateTime, Utc};
use dcpr_retrieval::models::EXCERPT_CHARS;
use dcpr_retrieval::RetrievalResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output for ingest command
#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub index_path: PathBuf,
    pub index_hash: String,
    pub chunk_count: usize,
    pub embedding_dim: usize,
    pub embedder: String,
    pub built_at: DateTime<Utc>,
}

/// Output for ask command and each chat answer
#[derive(Debug, Serialize)]
pub struct AnswerOutput {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<ExplainOutput>,
}

#[derive(Debug, Serialize)]
pub struct SourceItem {
    pub regulation_id: Option<String>,
    pub source: Option<String>,
    pub excerpt: String,
    pub similarity: f32,
    pub relevance: f32,
}

/// How the question was searched
#[derive(Debug, Serialize)]
pub struct ExplainOutput {
    pub standalone_question: String,
    pub search_text: String,
    pub filter: Option<String>,
    pub rejected: Vec<String>,
    pub candidates_considered: usize,
}

impl AnswerOutput {
    pub fn new(question: &str, result: &RetrievalResult, explain: bool) -> Self {
        let sources = result
            .passages_used
            .iter()
            .map(|p| SourceItem {
                regulation_id: p.passage.regulation_id().map(str::to_string),
                source: p.source().map(str::to_string),
                excerpt: p.excerpt(EXCERPT_CHARS),
                similarity: p.similarity,
                relevance: p.relevance,
            })
            .collect();

        let explanation = explain.then(|| ExplainOutput {
            standalone_question: result.standalone_question.clone(),
            search_text: result.structured_query.search_text.clone(),
            filter: result.structured_query.filter.as_ref().map(ToString::to_string),
            rejected: result.rejected.iter().map(ToString::to_string).collect(),
            candidates_considered: result.candidates_considered,
        });

        Self {
            question: question.to_string(),
            answer: result.answer.clone(),
            sources,
            explanation,
        }
    }
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub index_path: PathBuf,
    pub format_version: u32,
    pub embedder: String,
    pub dimensions: usize,
    pub passage_count: usize,
    pub built_at: DateTime<Utc>,

    /// Passages per value, for each categorical attribute
    pub attributes: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub entries: Vec<ConfigEntry>,
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

use chrono::{DateTime, Utc};
use dcpr_retrieval::{CitedSource, RetrievalResult, SessionSummary, TranscriptEntry};
use dcpr_store::IndexManifest;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub passages: usize,
}

impl HealthResponse {
    pub fn ok(passages: usize) -> Self {
        Self { status: "ok", service: "dcpr-api", passages }
    }
}

/// Session listing entry
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub turn_count: usize,
}

impl From<SessionSummary> for SessionResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            title: summary.title,
            created_at: summary.created_at,
            turn_count: summary.turn_count,
        }
    }
}

/// A session with its full history; assistant turns carry their sources
#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub history: Vec<TranscriptEntry>,
}

/// Answer to one question
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<CitedSource>,
    pub standalone_question: String,
    pub search_text: String,
    pub filter: Option<String>,
    pub rejected_filters: Vec<String>,
}

impl From<&RetrievalResult> for AskResponse {
    fn from(result: &RetrievalResult) -> Self {
        Self {
            answer: result.answer.clone(),
            sources: result.passages_used.iter().map(CitedSource::from).collect(),
            standalone_question: result.standalone_question.clone(),
            search_text: result.structured_query.search_text.clone(),
            filter: result.structured_query.filter.as_ref().map(ToString::to_string),
            rejected_filters: result.rejected.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Outcome of reloading the index from disk
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub embedder: String,
    pub passages: usize,
    pub previous_passages: usize,
    pub built_at: DateTime<Utc>,
}

impl ReloadResponse {
    pub fn new(manifest: IndexManifest, previous_passages: usize) -> Self {
        Self {
            embedder: manifest.embedder,
            passages: manifest.passage_count,
            previous_passages,
            built_at: manifest.built_at,
        }
    }
}

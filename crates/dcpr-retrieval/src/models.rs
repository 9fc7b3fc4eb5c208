use dcpr_core::error::FilterRejection;
use dcpr_core::models::{Passage, StructuredQuery, Turn};
use serde::Serialize;
use std::sync::Arc;

/// Characters of passage text shown when a source is displayed
pub const EXCERPT_CHARS: usize = 400;

/// A passage that survived reranking
#[derive(Debug, Clone)]
pub struct RankedPassage {
    pub passage: Arc<Passage>,

    /// Cosine similarity from candidate retrieval
    pub similarity: f32,

    /// Cross-encoder relevance score
    pub relevance: f32,
}

impl RankedPassage {
    /// The passage text cut to at most `max_chars` characters, with an
    /// ellipsis when truncated
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = self.passage.text.trim();
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.passage.metadata.text("source")
    }
}

/// A passage an answer drew on, as kept with the conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitedSource {
    pub regulation_id: Option<String>,
    pub source: Option<String>,
    pub excerpt: String,
    pub relevance: f32,
}

impl From<&RankedPassage> for CitedSource {
    fn from(passage: &RankedPassage) -> Self {
        Self {
            regulation_id: passage.passage.regulation_id().map(str::to_string),
            source: passage.source().map(str::to_string),
            excerpt: passage.excerpt(EXCERPT_CHARS),
            relevance: passage.relevance,
        }
    }
}

/// One turn of a conversation record with the sources of an answer.
/// Sources stay out of [`Turn`], which is what the models see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    #[serde(flatten)]
    pub turn: Turn,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<CitedSource>,
}

/// Outcome of one pipeline invocation
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub answer: String,

    /// Passages given to the answer generator, most relevant first
    pub passages_used: Vec<RankedPassage>,

    /// The question after history contextualization
    pub standalone_question: String,

    /// The structured query actually searched, after pruning
    pub structured_query: StructuredQuery,

    /// Filter fragments removed before search
    pub rejected: Vec<FilterRejection>,

    /// Passages returned by similarity search before reranking
    pub candidates_considered: usize,
}

impl RetrievalResult {
    /// Whether no passage survived filtering and search
    pub fn is_empty_retrieval(&self) -> bool {
        self.passages_used.is_empty()
    }
}

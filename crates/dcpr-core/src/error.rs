//! Error types for the DCPR assistant

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{Comparator, Operator};
use crate::schema::AttributeType;

#[derive(Debug, Error)]
pub enum DcprError {
    // Index errors
    #[error("Vector index unavailable at {path}: {reason}. Run 'dcpr ingest' first")]
    IndexUnavailable { path: PathBuf, reason: String },

    #[error("Index was built with embedder '{indexed}' but '{configured}' is configured")]
    EmbedderMismatch { indexed: String, configured: String },

    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Model errors
    #[error("Embedder unavailable: {reason}. Try: {remediation}")]
    EmbedderUnavailable { reason: String, remediation: String },

    #[error("Reranker unavailable: {reason}. Try: {remediation}")]
    RerankerUnavailable { reason: String, remediation: String },

    #[error("Generation failed during {stage}: {reason}")]
    GenerationFailed {
        stage: GenerationStage,
        reason: String,
        transient: bool,
    },

    // Query errors
    #[error("Filter rejected: {0}")]
    FilterRejected(#[from] FilterRejection),

    // Session errors
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Ingestion errors
    #[error("Failed to extract text from {format}: {reason}")]
    DocumentExtraction { format: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DcprError {
    /// Build a generation failure for the given stage
    pub fn generation(stage: GenerationStage, reason: impl Into<String>, transient: bool) -> Self {
        Self::GenerationFailed {
            stage,
            reason: reason.into(),
            transient,
        }
    }

    /// Whether retrying the same request later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::GenerationFailed { transient, .. } => *transient,
            Self::EmbedderUnavailable { .. } | Self::RerankerUnavailable { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for DcprError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// The generative stage a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationStage {
    Contextualize,
    ConstructQuery,
    Answer,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::Contextualize => "question contextualization",
            GenerationStage::ConstructQuery => "structured query construction",
            GenerationStage::Answer => "answer generation",
        };
        f.write_str(name)
    }
}

/// Reason a fragment of a filter expression cannot reach the vector index
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterRejection {
    #[error("comparator '{comparator}' on '{attribute}' is not supported")]
    UnsupportedComparator {
        attribute: String,
        comparator: Comparator,
    },

    #[error("operator '{0}' is not supported")]
    UnsupportedOperator(Operator),

    #[error("attribute '{0}' is not declared in the metadata schema")]
    UndeclaredAttribute(String),

    #[error("value for '{attribute}' is not a {expected}")]
    TypeMismatch {
        attribute: String,
        expected: AttributeType,
    },

    #[error("malformed filter: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, DcprError>;

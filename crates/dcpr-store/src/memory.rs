//! In-memory vector index.
//!
//! The index is immutable once built; concurrent searches only read, so no
//! locking is needed here. Replacing the index is handled by
//! [`SharedIndex`](crate::SharedIndex).

use async_trait::async_trait;
use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::{Passage, Predicate, ScoredPassage};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::ports::VectorIndex;

/// In-memory implementation of VectorIndex using exact cosine similarity
#[derive(Debug, Clone)]
pub struct MemoryVectorIndex {
    passages: Vec<Arc<Passage>>,
    dimensions: usize,
    embedder: String,
}

impl MemoryVectorIndex {
    /// Build an index from passages embedded by `embedder`.
    ///
    /// Every passage must carry an embedding of length `dimensions`.
    pub fn new(
        embedder: impl Into<String>,
        dimensions: usize,
        passages: Vec<Passage>,
    ) -> Result<Self> {
        if let Some(bad) = passages.iter().find(|p| p.embedding.len() != dimensions) {
            return Err(DcprError::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }

        Ok(Self {
            passages: passages.into_iter().map(Arc::new).collect(),
            dimensions,
            embedder: embedder.into(),
        })
    }

    /// Name of the embedding model the passages were embedded with
    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    pub fn passages(&self) -> &[Arc<Passage>] {
        &self.passages
    }

    /// Calculate cosine similarity between two vectors
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn search(
        &self,
        query: &[f32],
        predicate: &Predicate,
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        if query.len() != self.dimensions {
            return Err(DcprError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut results: Vec<ScoredPassage> = self
            .passages
            .iter()
            .filter(|passage| predicate.matches(&passage.metadata))
            .map(|passage| ScoredPassage {
                passage: Arc::clone(passage),
                score: Self::cosine_similarity(query, &passage.embedding),
            })
            .collect();

        let matched = results.len();

        // Sort by score descending; stable so equal scores keep corpus order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        // Take top k
        results.truncate(k);

        tracing::debug!(
            total = self.passages.len(),
            matched,
            returned = results.len(),
            filtered = !predicate.is_always(),
            "Vector search complete"
        );

        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.passages.len()
    }
}

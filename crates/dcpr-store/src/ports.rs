use async_trait::async_trait;
use dcpr_core::error::Result;
use dcpr_core::models::{Predicate, ScoredPassage};
use std::sync::Arc;

/// Port for filtered vector similarity search
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` passages satisfying `predicate`, ordered by
    /// descending similarity to `query`.
    ///
    /// The predicate is applied before ranking, so a restrictive filter never
    /// starves the result of matching passages that rank below unfiltered ones.
    async fn search(
        &self,
        query: &[f32],
        predicate: &Predicate,
        k: usize,
    ) -> Result<Vec<ScoredPassage>>;

    /// Get the dimensionality of stored vectors
    fn dimensions(&self) -> usize;

    /// Number of indexed passages
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<T: VectorIndex + ?Sized> VectorIndex for Arc<T> {
    async fn search(
        &self,
        query: &[f32],
        predicate: &Predicate,
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        (**self).search(query, predicate, k).await
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

use async_trait::async_trait;
use dcpr_core::error::Result;
use dcpr_core::models::{Predicate, ScoredPassage};
use std::sync::{Arc, RwLock};

use crate::memory::MemoryVectorIndex;
use crate::ports::VectorIndex;

/// Serving handle to the current index.
///
/// `swap` replaces the index pointer; searches already running keep their own
/// `Arc` to the previous index until they finish. The lock is held only to
/// clone or replace the pointer, never across an await.
#[derive(Debug, Clone)]
pub struct SharedIndex {
    current: Arc<RwLock<Arc<MemoryVectorIndex>>>,
}

impl SharedIndex {
    pub fn new(index: MemoryVectorIndex) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(index))) }
    }

    /// The index serving new requests
    pub fn current(&self) -> Arc<MemoryVectorIndex> {
        // A poisoned lock still guards a valid pointer.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Replace the serving index, returning the previous one
    pub fn swap(&self, index: MemoryVectorIndex) -> Arc<MemoryVectorIndex> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(index));
        tracing::info!(
            previous = previous.len(),
            current = guard.len(),
            "Serving index swapped"
        );
        previous
    }
}

#[async_trait]
impl VectorIndex for SharedIndex {
    async fn search(
        &self,
        query: &[f32],
        predicate: &Predicate,
        k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        let index = self.current();
        index.search(query, predicate, k).await
    }

    fn dimensions(&self) -> usize {
        self.current().dimensions()
    }

    fn len(&self) -> usize {
        self.current().len()
    }
}

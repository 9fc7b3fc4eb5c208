use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::{Passage, PassageId};
use dcpr_core::processing::{load_document, prepare_chunks, PreparedChunk, SplitConfig};
use dcpr_llm::ports::Embedder;
use dcpr_store::MemoryVectorIndex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Progress information for index building
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub phase: IndexPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Current phase of index building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    LoadingDocument,
    GeneratingChunks,
    GeneratingEmbeddings,
    Finalizing,
}

/// Result of building an index
#[derive(Debug)]
pub struct IndexBuildResult {
    pub index: MemoryVectorIndex,
    pub chunk_count: usize,
    pub embedding_dim: usize,

    /// Deterministic hash over chunk text and metadata
    pub index_hash: String,
}

/// Builds a vector index from a source document
pub struct IndexBuilder<E>
where
    E: Embedder,
{
    embedder: E,
    split: SplitConfig,
    batch_size: usize,
}

impl<E> IndexBuilder<E>
where
    E: Embedder,
{
    /// Create a new index builder
    pub fn new(embedder: E, split: SplitConfig) -> Self {
        Self { embedder, split, batch_size: 32 }
    }

    /// Set the batch size for embedding generation
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Load, split, annotate and embed the document at `path`
    pub async fn build_from_document<F>(&self, path: &Path, mut progress: F) -> Result<IndexBuildResult>
    where
        F: FnMut(IndexProgress),
    {
        progress(IndexProgress {
            phase: IndexPhase::LoadingDocument,
            current: 0,
            total: 1,
            message: format!("Loading {}", path.display()),
        });

        let text = load_document(path)?;
        self.build_from_text(&text, &path.display().to_string(), progress).await
    }

    /// Split, annotate and embed `text`, recording `source` on every passage
    pub async fn build_from_text<F>(&self, text: &str, source: &str, mut progress: F) -> Result<IndexBuildResult>
    where
        F: FnMut(IndexProgress),
    {
        progress(IndexProgress {
            phase: IndexPhase::GeneratingChunks,
            current: 0,
            total: 1,
            message: "Splitting text into chunks".to_string(),
        });

        let chunks = prepare_chunks(text, &self.split, source)?;
        if chunks.is_empty() {
            return Err(DcprError::DocumentExtraction {
                format: source.to_string(),
                reason: "document produced no text chunks".to_string(),
            });
        }

        tracing::info!(chunks = chunks.len(), source, "Document split");

        let passages = self.embed_chunks(chunks, &mut progress).await?;

        progress(IndexProgress {
            phase: IndexPhase::Finalizing,
            current: 0,
            total: 1,
            message: "Generating index hash".to_string(),
        });

        let index_hash = index_hash(&passages);
        let chunk_count = passages.len();
        let embedding_dim = self.embedder.dimensions();
        let index = MemoryVectorIndex::new(self.embedder.model_name(), embedding_dim, passages)?;

        Ok(IndexBuildResult { index, chunk_count, embedding_dim, index_hash })
    }

    /// Generate embeddings with progress reporting
    async fn embed_chunks<F>(&self, chunks: Vec<PreparedChunk>, progress: &mut F) -> Result<Vec<Passage>>
    where
        F: FnMut(IndexProgress),
    {
        let total = chunks.len();
        let mut passages = Vec::with_capacity(total);

        // Process in batches
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedder.embed(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(DcprError::EmbedderUnavailable {
                    reason: format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
                    remediation: format!("Check the embedder '{}'", self.embedder.model_name()),
                });
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                passages.push(Passage {
                    id: PassageId(chunk.index as u64),
                    text: chunk.text.clone(),
                    embedding,
                    metadata: chunk.metadata.clone(),
                });
            }

            let processed = passages.len();
            progress(IndexProgress {
                phase: IndexPhase::GeneratingEmbeddings,
                current: processed,
                total,
                message: format!("Generated {}/{} embeddings", processed, total),
            });
        }

        Ok(passages)
    }
}

/// Generate deterministic index hash
fn index_hash(passages: &[Passage]) -> String {
    let mut hasher = DefaultHasher::new();

    for passage in passages {
        passage.id.hash(&mut hasher);
        passage.text.hash(&mut hasher);
        for (name, value) in passage.metadata.iter() {
            name.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }
    }

    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dcpr_store::ports::VectorIndex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as (length, count of 'a')
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, t.matches('a').count() as f32])
                .collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn builder(batch_size: usize) -> IndexBuilder<CountingEmbedder> {
        IndexBuilder::new(
            CountingEmbedder { calls: AtomicUsize::new(0) },
            SplitConfig { chunk_size: 80, chunk_overlap: 10 },
        )
        .with_batch_size(batch_size)
    }

    const DOCUMENT: &str = "Regulation 30 applies in the Island City.\n\n\
        Table 12 lists FSI for Residential plots in the Suburbs.\n\n\
        Regulation 33(9) governs cluster development on 4000 sq. m plots.";

    #[tokio::test]
    async fn test_build_batches_and_annotates() {
        let builder = builder(2);
        let mut phases = Vec::new();

        let result = builder
            .build_from_text(DOCUMENT, "dcpr.md", |p| phases.push(p.phase))
            .await
            .unwrap();

        assert_eq!(result.chunk_count, 3);
        assert_eq!(result.index.len(), 3);
        assert_eq!(result.index.embedder(), "counting");
        assert_eq!(builder.embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(phases.last(), Some(&IndexPhase::Finalizing));

        let first = &result.index.passages()[0];
        assert_eq!(first.metadata.text("zone"), Some("Island City"));
        assert_eq!(first.metadata.text("source"), Some("dcpr.md"));
        assert_eq!(first.regulation_id(), Some("Reg 30"));
    }

    #[tokio::test]
    async fn test_hash_is_deterministic() {
        let a = builder(8).build_from_text(DOCUMENT, "dcpr.md", |_| {}).await.unwrap();
        let b = builder(1).build_from_text(DOCUMENT, "dcpr.md", |_| {}).await.unwrap();
        assert_eq!(a.index_hash, b.index_hash);
    }

    #[tokio::test]
    async fn test_empty_document_is_error() {
        let err = builder(2).build_from_text("  \n ", "empty.md", |_| {}).await.unwrap_err();
        assert!(matches!(err, DcprError::DocumentExtraction { .. }));
    }
}

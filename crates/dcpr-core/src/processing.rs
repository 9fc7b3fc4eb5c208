pub mod metadata;
pub mod split;

use crate::error::{DcprError, Result};
use crate::models::{MetadataValue, PassageMetadata};
use std::fs;
use std::path::Path;

pub use metadata::inject_metadata;
pub use split::{SplitConfig, TextSplitter};

/// A chunk of source text with its heuristic metadata, ready to be embedded
#[derive(Debug, Clone)]
pub struct PreparedChunk {
    pub index: usize,
    pub text: String,
    pub metadata: PassageMetadata,
}

/// Read the full text of a source document.
///
/// PDFs go through `pdf-extract`; everything else is read as UTF-8 text.
pub fn load_document(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| DcprError::DocumentExtraction {
            format: "PDF".to_string(),
            reason: format!("Failed to extract text: {}", e),
        })?
    } else {
        fs::read_to_string(path)?
    };

    if text.trim().is_empty() {
        tracing::warn!("Document contains no extractable text: {}", path.display());
    }

    Ok(text)
}

/// Split a document and attach metadata to every chunk
pub fn prepare_chunks(text: &str, config: &SplitConfig, source: &str) -> Result<Vec<PreparedChunk>> {
    let splitter = TextSplitter::new(config.clone())?;

    let chunks = splitter
        .split_text(text)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let mut metadata = inject_metadata(&chunk);
            metadata.insert("source", source);
            metadata.insert("chunk_id", MetadataValue::Number(index as f64));
            PreparedChunk { index, text: chunk, metadata }
        })
        .collect();

    Ok(chunks)
}

//! On-disk index format.
//!
//! An index is a directory holding `index.json` (the manifest) and
//! `passages.json`. Loading never falls back to an empty index: a missing or
//! unreadable directory is `IndexUnavailable`, and an index built by a
//! different embedder is `EmbedderMismatch`.

use chrono::{DateTime, Utc};
use dcpr_core::error::{DcprError, Result};
use dcpr_core::models::Passage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::memory::MemoryVectorIndex;
use crate::ports::VectorIndex;

pub const MANIFEST_FILE: &str = "index.json";
pub const PASSAGES_FILE: &str = "passages.json";
pub const FORMAT_VERSION: u32 = 1;

/// Describes a persisted index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,

    /// Embedding model the passages were embedded with
    pub embedder: String,

    pub dimensions: usize,
    pub passage_count: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Read only the manifest of the index at `dir`
    pub fn read(dir: &Path) -> Result<Self> {
        let manifest: IndexManifest = read_json(dir, MANIFEST_FILE)?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(unavailable(
                dir,
                format!(
                    "unsupported index format version {} (expected {})",
                    manifest.format_version, FORMAT_VERSION
                ),
            ));
        }

        Ok(manifest)
    }
}

/// Write `index` to `dir`, replacing any index already there
pub fn save_index(index: &MemoryVectorIndex, dir: &Path) -> Result<IndexManifest> {
    fs::create_dir_all(dir)?;

    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        embedder: index.embedder().to_string(),
        dimensions: index.dimensions(),
        passage_count: index.len(),
        built_at: Utc::now(),
    };

    let passages: Vec<&Passage> = index.passages().iter().map(|p| p.as_ref()).collect();

    // Passages first so a visible manifest always points at complete data.
    write_json_atomic(&dir.join(PASSAGES_FILE), &passages)?;
    write_json_atomic(&dir.join(MANIFEST_FILE), &manifest)?;

    tracing::info!(
        path = %dir.display(),
        passages = manifest.passage_count,
        embedder = %manifest.embedder,
        "Index saved"
    );

    Ok(manifest)
}

/// Load the index at `dir`, checking it was built by `expected_embedder`
pub fn load_index(dir: &Path, expected_embedder: &str) -> Result<MemoryVectorIndex> {
    if !dir.is_dir() {
        return Err(unavailable(dir, "directory does not exist".to_string()));
    }

    let manifest = IndexManifest::read(dir)?;

    if manifest.embedder != expected_embedder {
        return Err(DcprError::EmbedderMismatch {
            indexed: manifest.embedder,
            configured: expected_embedder.to_string(),
        });
    }

    let passages: Vec<Passage> = read_json(dir, PASSAGES_FILE)?;

    if passages.len() != manifest.passage_count {
        return Err(unavailable(
            dir,
            format!(
                "manifest lists {} passages but {} were found",
                manifest.passage_count,
                passages.len()
            ),
        ));
    }

    let index = MemoryVectorIndex::new(manifest.embedder, manifest.dimensions, passages)
        .map_err(|e| unavailable(dir, e.to_string()))?;

    tracing::info!(path = %dir.display(), passages = index.len(), "Index loaded");

    Ok(index)
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let content = fs::read_to_string(&path)
        .map_err(|e| unavailable(dir, format!("cannot read {}: {}", file, e)))?;

    serde_json::from_str(&content)
        .map_err(|e| unavailable(dir, format!("cannot parse {}: {}", file, e)))
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let content = serde_json::to_string(value)?;
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn unavailable(dir: &Path, reason: String) -> DcprError {
    DcprError::IndexUnavailable { path: PathBuf::from(dir), reason }
}

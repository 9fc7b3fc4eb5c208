use crate::cli::IngestArgs;
use crate::output::OutputWriter;
use crate::output_types::IngestOutput;
use crate::progress::{create_progress_bar, finish_success, spinner_for};
use anyhow::{bail, Context, Result};
use dcpr_core::config::LayeredConfig;
use dcpr_core::processing::SplitConfig;
use dcpr_llm::embedder_from_config;
use dcpr_retrieval::{IndexBuilder, IndexPhase, IndexProgress};
use dcpr_store::persist::MANIFEST_FILE;
use dcpr_store::save_index;

pub async fn execute(args: IngestArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    config.validate()?;

    let index_dir = &config.index_path.value;
    if index_dir.join(MANIFEST_FILE).exists() && !args.force {
        bail!(
            "An index already exists at {}. Use --force to rebuild it.",
            index_dir.display()
        );
    }

    if !args.path.exists() {
        bail!("Document not found: {}", args.path.display());
    }

    let embedder = embedder_from_config(config)?;
    let split = SplitConfig {
        chunk_size: config.chunk_size.value,
        chunk_overlap: config.chunk_overlap.value,
    };
    let builder = IndexBuilder::new(embedder, split).with_batch_size(args.batch_size);

    let spinner = spinner_for(output.is_json(), "Loading document...");
    let mut embedding_bar = None;

    let result = builder
        .build_from_document(&args.path, |progress: IndexProgress| match progress.phase {
            IndexPhase::GeneratingEmbeddings if !output.is_json() => {
                let bar = embedding_bar.get_or_insert_with(|| {
                    spinner.finish_and_clear();
                    create_progress_bar(progress.total as u64, "Generating embeddings")
                });
                bar.set_position(progress.current as u64);
            }
            _ => spinner.set_message(progress.message),
        })
        .await
        .with_context(|| format!("Failed to ingest {}", args.path.display()))?;

    if let Some(bar) = &embedding_bar {
        finish_success(bar, &format!("Embedded {} chunks", result.chunk_count));
    }
    spinner.finish_and_clear();

    let manifest = save_index(&result.index, index_dir)
        .with_context(|| format!("Failed to write index to {}", index_dir.display()))?;

    if output.is_json() {
        output.result(IngestOutput {
            index_path: index_dir.clone(),
            index_hash: result.index_hash,
            chunk_count: result.chunk_count,
            embedding_dim: result.embedding_dim,
            embedder: manifest.embedder,
            built_at: manifest.built_at,
        })?;
    } else {
        output.success("Index built successfully");
        output.section("Index Information");
        output.kv("Path", index_dir.display());
        output.kv("Hash", &result.index_hash);
        output.kv("Chunks", result.chunk_count);
        output.kv("Embedding Dimension", result.embedding_dim);
        output.kv("Embedder", &manifest.embedder);
    }

    Ok(())
}

use crate::output::OutputWriter;
use crate::output_types::InspectOutput;
use anyhow::{Context, Result};
use dcpr_core::config::LayeredConfig;
use dcpr_store::{load_index, IndexManifest};
use std::collections::BTreeMap;
use tabled::Tabled;

/// Attributes whose value distribution is summarized
const SUMMARIZED_ATTRIBUTES: [&str; 3] = ["zone", "scheme_type", "category"];

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Passages")]
    count: usize,
}

pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let index_dir = &config.index_path.value;

    let manifest = IndexManifest::read(index_dir).with_context(|| {
        format!("No index at {}. Run 'dcpr ingest <document>' first.", index_dir.display())
    })?;
    let index = load_index(index_dir, &manifest.embedder)?;

    let mut attributes: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for passage in index.passages() {
        for name in SUMMARIZED_ATTRIBUTES {
            let value = passage.metadata.text(name).unwrap_or("(missing)");
            *attributes
                .entry(name.to_string())
                .or_default()
                .entry(value.to_string())
                .or_default() += 1;
        }
    }

    if output.is_json() {
        return output.result(InspectOutput {
            index_path: index_dir.clone(),
            format_version: manifest.format_version,
            embedder: manifest.embedder,
            dimensions: manifest.dimensions,
            passage_count: manifest.passage_count,
            built_at: manifest.built_at,
            attributes,
        });
    }

    output.section("Index");
    output.kv("Path", index_dir.display());
    output.kv("Embedder", &manifest.embedder);
    output.kv("Dimensions", manifest.dimensions);
    output.kv("Passages", manifest.passage_count);
    output.kv("Built", manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC"));

    let with_regulation = index.passages().iter().filter(|p| p.regulation_id().is_some()).count();
    output.kv("With regulation id", with_regulation);

    output.section("Metadata");
    let rows: Vec<ValueRow> = attributes
        .iter()
        .flat_map(|(attribute, values)| {
            values.iter().map(move |(value, count)| ValueRow {
                attribute: attribute.clone(),
                value: value.clone(),
                count: *count,
            })
        })
        .collect();
    output.table(rows);

    Ok(())
}

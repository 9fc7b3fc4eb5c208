use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, ConfigOutput};
use anyhow::Result;
use dcpr_core::config::LayeredConfig;
use tabled::Tabled;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry { key, value, source: source.to_string() })
        .collect();
    let problem = config.validate().err().map(|e| e.to_string());

    if output.is_json() {
        return output.result(ConfigOutput { entries, valid: problem.is_none(), problem });
    }

    output.section("Effective Configuration");
    output.table(
        entries
            .into_iter()
            .map(|e| ConfigRow { key: e.key, value: e.value, source: e.source })
            .collect(),
    );

    match problem {
        None => output.success("Configuration is valid"),
        Some(problem) => output.warning(problem),
    }

    Ok(())
}

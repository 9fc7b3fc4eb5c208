//! Command implementations

mod ask;
mod chat;
mod config;
mod ingest;
mod inspect;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(cli.config.as_deref(), cli.overrides.to_overrides())?;

    match cli.command {
        Commands::Ingest(args) => ingest::execute(args, &config, &output).await,
        Commands::Ask(args) => ask::execute(args, &config, &output, cli.explain).await,
        Commands::Chat => chat::execute(&config, &output, cli.explain).await,
        Commands::Inspect => inspect::execute(&config, &output),
        Commands::Config => config::execute(&config, &output),
    }
}

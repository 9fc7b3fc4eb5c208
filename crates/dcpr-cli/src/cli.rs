use clap::{Args, Parser, Subcommand};
use dcpr_core::config::CliConfigOverrides;
use std::path::PathBuf;

/// DCPR - Question answering over Mumbai's DCPR 2034 regulations
#[derive(Parser, Debug)]
#[command(name = "dcpr")]
#[command(about = "Question answering over Mumbai's DCPR 2034 regulations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show the structured query, dropped filter fragments and scores
    #[arg(long, global = true)]
    pub explain: bool,

    /// Configuration file (defaults to ./dcpr.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that take precedence over the file and environment
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Index directory
    #[arg(long, global = true, value_name = "DIR")]
    pub index: Option<PathBuf>,

    /// Embedder to use (e.g., "ollama:nomic-embed-text")
    #[arg(long, global = true)]
    pub embedder: Option<String>,

    /// Chat model to use (e.g., "anthropic:claude-sonnet-4-5-20250929")
    #[arg(long, global = true)]
    pub llm: Option<String>,

    /// Candidates fetched by similarity search
    #[arg(long, global = true)]
    pub candidate_k: Option<usize>,

    /// Passages kept after reranking
    #[arg(long, global = true)]
    pub top_n: Option<usize>,
}

impl OverrideArgs {
    pub fn to_overrides(&self) -> CliConfigOverrides {
        CliConfigOverrides {
            index_path: self.index.clone(),
            embedder: self.embedder.clone(),
            llm: self.llm.clone(),
            candidate_k: self.candidate_k,
            top_n: self.top_n,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split, annotate and embed a regulations document into an index
    Ingest(IngestArgs),

    /// Ask a single question
    Ask(AskArgs),

    /// Start an interactive chat session
    Chat,

    /// Show what the index contains
    Inspect,

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Path to the document (PDF, Markdown or plain text)
    pub path: PathBuf,

    /// Number of chunks embedded per request
    #[arg(long, default_value = "32")]
    pub batch_size: usize,

    /// Overwrite an existing index
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::parse_from(["dcpr", "ask", "What is FSI?", "--top-n", "3", "--json"]);

        assert!(cli.json);
        assert_eq!(cli.overrides.top_n, Some(3));
        assert!(matches!(cli.command, Commands::Ask(ref a) if a.question == "What is FSI?"));
    }

    #[test]
    fn test_ingest_defaults() {
        let cli = Cli::parse_from(["dcpr", "ingest", "DCPR_2034.pdf"]);

        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.batch_size, 32);
        assert!(!args.force);
    }

    #[test]
    fn test_overrides_map_to_config() {
        let cli = Cli::parse_from(["dcpr", "--index", "/tmp/idx", "--llm", "ollama:llama3", "inspect"]);
        let overrides = cli.overrides.to_overrides();

        assert_eq!(overrides.index_path, Some(PathBuf::from("/tmp/idx")));
        assert_eq!(overrides.llm.as_deref(), Some("ollama:llama3"));
        assert!(overrides.embedder.is_none());
    }
}

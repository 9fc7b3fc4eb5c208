use crate::error::{DcprError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "env",
            ConfigSource::Cli => "cli",
        };
        f.write_str(name)
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the DCPR assistant
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub index_path: ConfigValue<PathBuf>,
    pub embedder: ConfigValue<String>,
    pub embedding_dim: ConfigValue<usize>,
    pub ollama_url: ConfigValue<String>,
    pub reranker_url: ConfigValue<String>,
    pub reranker_model: ConfigValue<String>,
    pub llm: ConfigValue<String>,
    pub candidate_k: ConfigValue<usize>,
    pub top_n: ConfigValue<usize>,
    pub llm_timeout_secs: ConfigValue<u64>,
    pub chunk_size: ConfigValue<usize>,
    pub chunk_overlap: ConfigValue<usize>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        use ConfigSource::Default as D;

        Self {
            index_path: ConfigValue::new(PathBuf::from("dcpr_index"), D),
            embedder: ConfigValue::new("ollama:nomic-embed-text".to_string(), D),
            embedding_dim: ConfigValue::new(768, D),
            ollama_url: ConfigValue::new("http://localhost:11434".to_string(), D),
            reranker_url: ConfigValue::new("http://localhost:8080".to_string(), D),
            reranker_model: ConfigValue::new("cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(), D),
            llm: ConfigValue::new("anthropic:claude-sonnet-4-5-20250929".to_string(), D),
            candidate_k: ConfigValue::new(28, D),
            top_n: ConfigValue::new(7, D),
            llm_timeout_secs: ConfigValue::new(60, D),
            chunk_size: ConfigValue::new(2000, D),
            chunk_overlap: ConfigValue::new(500, D),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| DcprError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| DcprError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let src = ConfigSource::File;
        if let Some(v) = file_config.index_path {
            self.index_path.update(v, src);
        }
        if let Some(v) = file_config.embedder {
            self.embedder.update(v, src);
        }
        if let Some(v) = file_config.embedding_dim {
            self.embedding_dim.update(v, src);
        }
        if let Some(v) = file_config.ollama_url {
            self.ollama_url.update(v, src);
        }
        if let Some(v) = file_config.reranker_url {
            self.reranker_url.update(v, src);
        }
        if let Some(v) = file_config.reranker_model {
            self.reranker_model.update(v, src);
        }
        if let Some(v) = file_config.llm {
            self.llm.update(v, src);
        }
        if let Some(v) = file_config.candidate_k {
            self.candidate_k.update(v, src);
        }
        if let Some(v) = file_config.top_n {
            self.top_n.update(v, src);
        }
        if let Some(v) = file_config.llm_timeout_secs {
            self.llm_timeout_secs.update(v, src);
        }
        if let Some(v) = file_config.chunk_size {
            self.chunk_size.update(v, src);
        }
        if let Some(v) = file_config.chunk_overlap {
            self.chunk_overlap.update(v, src);
        }

        Ok(self)
    }

    /// Load the config file only if it exists
    pub fn load_from_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().exists() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from `DCPR_*` environment variables
    pub fn load_from_env(mut self) -> Self {
        let src = ConfigSource::Environment;

        if let Ok(v) = env::var("DCPR_INDEX_PATH") {
            self.index_path.update(PathBuf::from(v), src);
        }
        if let Ok(v) = env::var("DCPR_EMBEDDER") {
            self.embedder.update(v, src);
        }
        if let Some(v) = parse_env("DCPR_EMBEDDING_DIM") {
            self.embedding_dim.update(v, src);
        }
        if let Ok(v) = env::var("DCPR_OLLAMA_URL") {
            self.ollama_url.update(v, src);
        }
        if let Ok(v) = env::var("DCPR_RERANKER_URL") {
            self.reranker_url.update(v, src);
        }
        if let Ok(v) = env::var("DCPR_RERANKER_MODEL") {
            self.reranker_model.update(v, src);
        }
        if let Ok(v) = env::var("DCPR_LLM") {
            self.llm.update(v, src);
        }
        if let Some(v) = parse_env("DCPR_CANDIDATE_K") {
            self.candidate_k.update(v, src);
        }
        if let Some(v) = parse_env("DCPR_TOP_N") {
            self.top_n.update(v, src);
        }
        if let Some(v) = parse_env("DCPR_LLM_TIMEOUT_SECS") {
            self.llm_timeout_secs.update(v, src);
        }
        if let Some(v) = parse_env("DCPR_CHUNK_SIZE") {
            self.chunk_size.update(v, src);
        }
        if let Some(v) = parse_env("DCPR_CHUNK_OVERLAP") {
            self.chunk_overlap.update(v, src);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        let src = ConfigSource::Cli;

        if let Some(v) = overrides.index_path {
            self.index_path.update(v, src);
        }
        if let Some(v) = overrides.embedder {
            self.embedder.update(v, src);
        }
        if let Some(v) = overrides.llm {
            self.llm.update(v, src);
        }
        if let Some(v) = overrides.candidate_k {
            self.candidate_k.update(v, src);
        }
        if let Some(v) = overrides.top_n {
            self.top_n.update(v, src);
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.top_n.value == 0 {
            return Err(DcprError::ConfigInvalid {
                key: "top_n".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.llm_timeout_secs.value == 0 {
            return Err(DcprError::ConfigInvalid {
                key: "llm_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.candidate_k.value < self.top_n.value {
            return Err(DcprError::ConfigInvalid {
                key: "candidate_k".to_string(),
                reason: format!(
                    "candidate_k ({}) must be at least top_n ({})",
                    self.candidate_k.value, self.top_n.value
                ),
            });
        }

        if self.chunk_overlap.value >= self.chunk_size.value {
            return Err(DcprError::ConfigInvalid {
                key: "chunk_overlap".to_string(),
                reason: format!(
                    "overlap ({}) must be less than chunk_size ({})",
                    self.chunk_overlap.value, self.chunk_size.value
                ),
            });
        }

        parse_model_spec(&self.embedder.value)?;
        parse_model_spec(&self.llm.value)?;

        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> BTreeMap<String, (String, ConfigSource)> {
        let mut map = BTreeMap::new();

        map.insert(
            "index_path".to_string(),
            (self.index_path.value.display().to_string(), self.index_path.source),
        );
        map.insert("embedder".to_string(), (self.embedder.value.clone(), self.embedder.source));
        map.insert(
            "embedding_dim".to_string(),
            (self.embedding_dim.value.to_string(), self.embedding_dim.source),
        );
        map.insert("ollama_url".to_string(), (self.ollama_url.value.clone(), self.ollama_url.source));
        map.insert(
            "reranker_url".to_string(),
            (self.reranker_url.value.clone(), self.reranker_url.source),
        );
        map.insert(
            "reranker_model".to_string(),
            (self.reranker_model.value.clone(), self.reranker_model.source),
        );
        map.insert("llm".to_string(), (self.llm.value.clone(), self.llm.source));
        map.insert(
            "candidate_k".to_string(),
            (self.candidate_k.value.to_string(), self.candidate_k.source),
        );
        map.insert("top_n".to_string(), (self.top_n.value.to_string(), self.top_n.source));
        map.insert(
            "llm_timeout_secs".to_string(),
            (self.llm_timeout_secs.value.to_string(), self.llm_timeout_secs.source),
        );
        map.insert(
            "chunk_size".to_string(),
            (self.chunk_size.value.to_string(), self.chunk_size.source),
        );
        map.insert(
            "chunk_overlap".to_string(),
            (self.chunk_overlap.value.to_string(), self.chunk_overlap.source),
        );

        map
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected a non-negative integer", key, raw);
            None
        }
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    index_path: Option<PathBuf>,
    embedder: Option<String>,
    embedding_dim: Option<usize>,
    ollama_url: Option<String>,
    reranker_url: Option<String>,
    reranker_model: Option<String>,
    llm: Option<String>,
    candidate_k: Option<usize>,
    top_n: Option<usize>,
    llm_timeout_secs: Option<u64>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub index_path: Option<PathBuf>,
    pub embedder: Option<String>,
    pub llm: Option<String>,
    pub candidate_k: Option<usize>,
    pub top_n: Option<usize>,
}

/// Model provider named in a `provider:model` spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    Anthropic,
}

/// A parsed `provider:model` spec such as `ollama:nomic-embed-text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: Provider,
    pub model: String,
}

/// Parse a `provider:model` spec
pub fn parse_model_spec(s: &str) -> Result<ModelSpec> {
    let invalid = |reason: String| DcprError::ConfigInvalid { key: "model".to_string(), reason };

    let (provider, model) = s
        .split_once(':')
        .ok_or_else(|| invalid(format!("Expected 'provider:model', got '{}'", s)))?;

    if model.trim().is_empty() {
        return Err(invalid(format!("Missing model name in '{}'", s)));
    }

    let provider = match provider.to_lowercase().as_str() {
        "ollama" => Provider::Ollama,
        "anthropic" => Provider::Anthropic,
        other => {
            return Err(invalid(format!("Unknown provider '{}'. Use ollama or anthropic", other)))
        }
    };

    Ok(ModelSpec { provider, model: model.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.top_n.value, 7);
        assert_eq!(config.candidate_k.value, 28);
        assert_eq!(config.chunk_size.value, 2000);
        assert_eq!(config.chunk_overlap.value, 500);
        assert_eq!(config.embedder.source, ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
index_path = "/data/dcpr"
llm = "ollama:llama3.1"
top_n = 5
candidate_k = 40
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.index_path.value, PathBuf::from("/data/dcpr"));
        assert_eq!(config.llm.value, "ollama:llama3.1");
        assert_eq!(config.top_n.value, 5);
        assert_eq!(config.candidate_k.value, 40);
        assert_eq!(config.candidate_k.source, ConfigSource::File);
        assert_eq!(config.chunk_size.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_pool_smaller_than_output() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            candidate_k: Some(3),
            ..Default::default()
        });

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DcprError::ConfigInvalid { ref key, .. } if key == "candidate_k"));
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let mut config = LayeredConfig::with_defaults();
        config.top_n.update(0, ConfigSource::Cli);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = LayeredConfig::with_defaults();
        config.llm_timeout_secs.update(0, ConfigSource::Environment);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DcprError::ConfigInvalid { ref key, .. } if key == "llm_timeout_secs"));
    }

    #[test]
    fn test_parse_model_spec() {
        let spec = parse_model_spec("ollama:nomic-embed-text").unwrap();
        assert_eq!(spec.provider, Provider::Ollama);
        assert_eq!(spec.model, "nomic-embed-text");

        let spec = parse_model_spec("Anthropic:claude-sonnet-4-5-20250929").unwrap();
        assert_eq!(spec.provider, Provider::Anthropic);

        assert!(parse_model_spec("nomic-embed-text").is_err());
        assert!(parse_model_spec("openai:gpt").is_err());
        assert!(parse_model_spec("ollama:").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let map = LayeredConfig::with_defaults().to_inspection_map();

        assert_eq!(map.len(), 12);
        let (top_n, source) = &map["top_n"];
        assert_eq!(top_n, "7");
        assert_eq!(*source, ConfigSource::Default);
    }
}

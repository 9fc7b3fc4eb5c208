//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use dcpr_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "dcpr.toml";

/// Load defaults, the config file, `DCPR_*` variables and CLI overrides,
/// in increasing precedence. An explicitly named file must exist.
pub fn load_config(file: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let config = match file {
        Some(path) => LayeredConfig::with_defaults()
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?,
        None => LayeredConfig::with_defaults()
            .load_from_optional_file(PathBuf::from(DEFAULT_CONFIG_FILE))
            .context("Failed to load configuration file")?,
    };

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);

    Ok(config)
}

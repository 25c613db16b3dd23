//! Command implementations for the Tally CLI

pub mod serve;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_config::Config;
use tracing::info;

/// Paths tried, in order, when no `--config` is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/tally.toml", "tally.toml"];

/// Load the configuration
///
/// An explicit path must exist. Without one, the default paths are tried
/// and built-in defaults are used if none exists. Returns the path the
/// configuration came from, if any.
pub fn load_config(path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        let config = Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        return Ok((config, Some(path.to_path_buf())));
    }

    for candidate in DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from) {
        if candidate.exists() {
            info!(config = %candidate.display(), "using config file");
            let config = Config::from_file(&candidate)
                .with_context(|| format!("failed to load configuration from {}", candidate.display()))?;
            return Ok((config, Some(candidate)));
        }
    }

    info!("no config file found, using defaults (no sinks, no pipelines)");
    Ok((Config::default(), None))
}

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub total_pages: Option<u64>,
    pub pages_per_batch: Option<u64>,
    pub batch_size: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub resource_pause_secs: Option<u64>,
    pub disable_resource_check: bool,
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use pagebatch::config::load_config;
///
/// let config = load_config(Path::new("pagebatch.toml")).unwrap();
/// println!("Pages per batch: {}", config.run.pages_per_batch);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the effective configuration
///
/// The hash covers the configuration after overrides, re-serialized, so
/// comments and formatting in the file do not count but command-line
/// overrides do. It is recorded in the global checkpoint so a resumed run
/// can tell whether the configuration changed since the run started.
pub fn compute_config_hash(config: &Config) -> Result<String, ConfigError> {
    let content = toml::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration, applies overrides, and returns it with its hash
pub fn load_config_with_hash(
    path: &Path,
    overrides: &ConfigOverrides,
) -> Result<(Config, String), ConfigError> {
    let config = apply_overrides(load_config(path)?, overrides)?;
    let hash = compute_config_hash(&config)?;
    Ok((config, hash))
}

/// Applies command-line overrides and validates the result again
pub fn apply_overrides(
    mut config: Config,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    if let Some(total_pages) = overrides.total_pages {
        config.run.total_pages = total_pages;
    }
    if let Some(pages_per_batch) = overrides.pages_per_batch {
        config.run.pages_per_batch = pages_per_batch;
    }
    if let Some(batch_size) = overrides.batch_size {
        config.run.batch_size = batch_size;
    }
    if let Some(output_dir) = &overrides.output_dir {
        config.run.output_dir = output_dir.clone();
    }
    if let Some(pause_secs) = overrides.resource_pause_secs {
        config.resources.pause_secs = pause_secs;
    }
    if overrides.disable_resource_check {
        config.resources.enabled = false;
    }

    validate(&config)?;
    Ok(config)
}

use crate::config::types::{Config, ExecutorConfig, ResourceConfig, RunConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_run_config(&config.run)?;
    validate_resource_config(&config.resources)?;
    validate_executor_config(&config.executor)?;
    Ok(())
}

/// Validates batch loop configuration
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.total_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "total_pages must be >= 1, got {}",
            config.total_pages
        )));
    }

    if config.pages_per_batch < 1 {
        return Err(ConfigError::Validation(format!(
            "pages_per_batch must be >= 1, got {}",
            config.pages_per_batch
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.max_batch_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_batch_attempts must be >= 1, got {}",
            config.max_batch_attempts
        )));
    }

    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates resource monitoring configuration
fn validate_resource_config(config: &ResourceConfig) -> Result<(), ConfigError> {
    validate_percent("max_memory_percent", config.max_memory_percent)?;
    validate_percent("max_disk_percent", config.max_disk_percent)?;

    if config.enabled && config.pause_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "pause_secs must be >= 1 when resource checks are enabled, got {}",
            config.pause_secs
        )));
    }

    Ok(())
}

/// Validates external crawl command configuration
fn validate_executor_config(config: &ExecutorConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "executor program cannot be empty".to_string(),
        ));
    }

    if config.result_file.is_empty() || config.result_file.contains("..") {
        return Err(ConfigError::Validation(format!(
            "result_file must be a plain file name inside the batch directory, got '{}'",
            config.result_file
        )));
    }

    Ok(())
}

fn validate_percent(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0 and 100, got {}",
            name, value
        )));
    }
    Ok(())
}

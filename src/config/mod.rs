//! Configuration module for Pagebatch
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and applying command-line overrides on top of them.
//!
//! # Example
//!
//! ```no_run
//! use pagebatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagebatch.toml")).unwrap();
//! println!("Crawling {} pages", config.run.total_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ExecutorConfig, ResourceConfig, RunConfig, StopPolicy};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, ConfigOverrides,
};

//! Pagebatch: a resumable batch orchestrator for long paginated crawls
//!
//! This crate partitions a page range into batches, hands each batch to an
//! external crawl unit, pauses under host resource pressure, and persists
//! durable progress so an interrupted run resumes exactly where it stopped.

pub mod batch;
pub mod config;
pub mod crawler;
pub mod monitor;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Pagebatch operations
#[derive(Debug, Error)]
pub enum PagebatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StoreError),

    #[error("Batch {batch_number} failed after {attempts} attempt(s): {source}")]
    BatchFailed {
        batch_number: u64,
        attempts: u32,
        source: crawler::ExecutorError,
    },

    #[error(
        "Stats divergence: folded {folded:?} but persisted summaries give {recomputed:?}"
    )]
    StatsDivergence {
        folded: output::GlobalStats,
        recomputed: output::GlobalStats,
    },

    #[error(
        "Checkpoint records {expected} completed batches but only {found} summaries exist"
    )]
    MissingSummaries { expected: u64, found: u64 },

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::Phase,
        to: state::Phase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Batch planning errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Invalid range: resume offset {resume_offset} is beyond total units {total_units}")]
    ResumeBeyondTotal { resume_offset: u64, total_units: u64 },

    #[error("Invalid range: units per batch must be greater than zero")]
    ZeroBatchSize,

    #[error("Invalid range: first batch number must be at least 1")]
    ZeroBatchNumber,
}

/// Result type alias for Pagebatch operations
pub type Result<T> = std::result::Result<T, PagebatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use batch::{plan, BatchDescriptor, BatchResult, BatchSummary};
pub use config::Config;
pub use crawler::{CrawlExecutor, Orchestrator, RunOutcome};
pub use state::{BatchCheckpoint, GlobalCheckpoint, Phase, RunStatus};

//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::batch::BatchSummary;
use crate::output::{FinalSummary, GlobalStats};
use crate::state::{BatchCheckpoint, GlobalCheckpoint};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Summary for batch {batch_number} already exists")]
    DuplicateSummary { batch_number: u64 },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for checkpoint backend implementations
///
/// Every save must be atomic: a crash during a save leaves either the old
/// record or the new one, never a partial write. The orchestrator is the only
/// writer.
pub trait CheckpointStore {
    // ===== Global Checkpoint =====

    /// Loads the global checkpoint, or `None` for a fresh run
    fn load_global(&self) -> StoreResult<Option<GlobalCheckpoint>>;

    /// Atomically replaces the global checkpoint
    fn save_global(&mut self, checkpoint: &GlobalCheckpoint) -> StoreResult<()>;

    // ===== Batch Checkpoints =====

    /// Directory owned by one batch
    fn batch_dir(&self, batch_number: u64) -> PathBuf;

    /// Loads the checkpoint stored in a batch's directory
    fn load_batch(&self, batch_number: u64) -> StoreResult<Option<BatchCheckpoint>>;

    /// Atomically replaces the checkpoint in a batch's directory
    fn save_batch(&mut self, checkpoint: &BatchCheckpoint) -> StoreResult<()>;

    // ===== Batch Summaries =====

    /// Loads the summary of one batch
    fn load_summary(&self, batch_number: u64) -> StoreResult<Option<BatchSummary>>;

    /// Writes a batch summary exactly once
    ///
    /// Fails with [`StoreError::DuplicateSummary`] if the batch already has one.
    fn save_summary(&mut self, summary: &BatchSummary) -> StoreResult<()>;

    /// Loads every persisted summary, ordered by batch number
    fn load_summaries(&self) -> StoreResult<Vec<BatchSummary>>;

    // ===== Reports =====

    /// Atomically replaces the derived stats report
    fn save_stats(&mut self, stats: &GlobalStats) -> StoreResult<()>;

    /// Atomically writes the end-of-run report
    fn save_final_summary(&mut self, summary: &FinalSummary) -> StoreResult<()>;

    // ===== Maintenance =====

    /// Removes all run state so the next run starts from offset 0
    fn reset(&mut self) -> StoreResult<()>;
}

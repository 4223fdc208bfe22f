//! Storage module for persisting run progress
//!
//! This module handles all durable state for a run, including:
//! - The global checkpoint that drives resumption
//! - Per-batch checkpoints scoped to each batch's directory
//! - Write-once batch summaries
//! - Derived stats and the end-of-run report

mod file_store;
mod traits;

pub use file_store::FileStore;
pub use traits::{CheckpointStore, StoreError, StoreResult};

use std::path::Path;

/// Opens the file-backed store for an output directory
///
/// # Arguments
///
/// * `path` - The run's output directory
///
/// # Returns
///
/// * `Ok(FileStore)` - Store rooted at `path`, created if missing
/// * `Err(StoreError)` - The directory could not be created
pub fn open_store(path: &Path) -> StoreResult<FileStore> {
    FileStore::open(path)
}

//! Output module for run statistics and reports
//!
//! This module handles:
//! - Folding batch summaries into global statistics
//! - Recomputing statistics from the persisted summary history
//! - Printing statistics and building the end-of-run report

mod stats;
mod summary;

pub use stats::{fold, print_statistics, recompute, GlobalStats};
pub use summary::FinalSummary;

use crate::state::GlobalCheckpoint;
use crate::storage::CheckpointStore;
use crate::PagebatchError;

/// Loads the checkpoint and recomputes statistics from storage
///
/// # Arguments
///
/// * `store` - The store holding the run's summaries
///
/// # Returns
///
/// * `Ok((GlobalStats, Option<GlobalCheckpoint>))` - Totals over every persisted summary
/// * `Err(PagebatchError)` - A record could not be read
pub fn load_statistics(
    store: &dyn CheckpointStore,
) -> Result<(GlobalStats, Option<GlobalCheckpoint>), PagebatchError> {
    let summaries = store.load_summaries()?;
    let checkpoint = store.load_global()?;
    Ok((recompute(&summaries), checkpoint))
}

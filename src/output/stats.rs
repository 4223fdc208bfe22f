//! Statistics aggregation across batches
//!
//! Running totals are folded in one summary at a time and can always be
//! rebuilt from the persisted summary history.

use crate::batch::BatchSummary;
use crate::state::GlobalCheckpoint;
use serde::{Deserialize, Serialize};

/// Running totals over all recorded batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_products: u64,
    pub matched_products: u64,
    pub batches_completed: u64,
}

impl GlobalStats {
    /// Percentage of products that matched, 0 when nothing was crawled
    pub fn match_percentage(&self) -> f64 {
        if self.total_products == 0 {
            0.0
        } else {
            (self.matched_products as f64 / self.total_products as f64) * 100.0
        }
    }
}

/// Folds one batch summary into the running totals
///
/// # Example
///
/// ```
/// use pagebatch::output::{fold, GlobalStats};
/// # use pagebatch::batch::{BatchDescriptor, BatchResult, BatchSummary};
/// # let batch = BatchDescriptor { batch_number: 1, start_offset: 0, end_offset: 4, created_at: chrono::Utc::now() };
/// # let summary = BatchSummary::new(&batch, BatchResult { total_products: 100, matched_products: 62 }, "out".into());
///
/// let stats = fold(fold(GlobalStats::default(), &summary), &summary);
/// assert_eq!(stats.total_products, 200);
/// assert_eq!(stats.matched_products, 124);
/// assert_eq!(stats.batches_completed, 2);
/// ```
pub fn fold(current: GlobalStats, summary: &BatchSummary) -> GlobalStats {
    GlobalStats {
        total_products: current.total_products + summary.total_products,
        matched_products: current.matched_products + summary.matched_products,
        batches_completed: current.batches_completed + 1,
    }
}

/// Rebuilds the totals from a full summary history
pub fn recompute<'a, I>(summaries: I) -> GlobalStats
where
    I: IntoIterator<Item = &'a BatchSummary>,
{
    summaries
        .into_iter()
        .fold(GlobalStats::default(), |stats, summary| fold(stats, summary))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - Totals recomputed from the persisted summaries
/// * `checkpoint` - The global checkpoint, if the run has one
/// * `total_pages` - Configured size of the page range
pub fn print_statistics(
    stats: &GlobalStats,
    checkpoint: Option<&GlobalCheckpoint>,
    total_pages: u64,
) {
    println!("=== Run Statistics ===\n");

    match checkpoint {
        Some(checkpoint) => {
            println!("Checkpoint:");
            println!("  Status: {:?}", checkpoint.status);
            println!("  Next offset: {} / {}", checkpoint.next_offset, total_pages);
            println!("  Batches completed: {}", checkpoint.batches_completed);
            println!("  Run started: {}", checkpoint.run_started_at.to_rfc3339());
            println!("  Last updated: {}", checkpoint.last_updated_at.to_rfc3339());

            let progress = if total_pages > 0 {
                (checkpoint.next_offset as f64 / total_pages as f64) * 100.0
            } else {
                0.0
            };
            println!("  Progress: {:.1}%", progress);
        }
        None => println!("Checkpoint: none (run has not started)"),
    }
    println!();

    println!("Products:");
    println!("  Batches summarized: {}", stats.batches_completed);
    println!("  Total products: {}", stats.total_products);
    println!(
        "  Matched products: {} ({:.2}%)",
        stats.matched_products,
        stats.match_percentage()
    );

    if let Some(checkpoint) = checkpoint {
        if checkpoint.batches_completed != stats.batches_completed {
            println!();
            println!(
                "Note: {} summaries on disk but checkpoint records {} completed batches",
                stats.batches_completed, checkpoint.batches_completed
            );
        }
    }
}

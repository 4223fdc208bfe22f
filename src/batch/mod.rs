//! Batch data model and planning
//!
//! A batch is a contiguous, inclusive slice of the page range that is crawled
//! as one unit of work, with its own directory, checkpoint and summary.

mod planner;

pub use planner::plan;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One planned batch of pages
///
/// Offsets are inclusive on both ends. Descriptors are produced by [`plan`]
/// and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDescriptor {
    pub batch_number: u64,
    pub start_offset: u64,
    pub end_offset: u64,
    pub created_at: DateTime<Utc>,
}

impl BatchDescriptor {
    /// Number of pages covered by this batch
    pub fn page_count(&self) -> u64 {
        self.end_offset - self.start_offset + 1
    }

    /// Offset of the first page after this batch
    pub fn next_offset(&self) -> u64 {
        self.end_offset + 1
    }
}

/// Counts returned by the crawl unit for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_products: u64,
    pub matched_products: u64,
}

/// Immutable record of one completed batch
///
/// Field names are a stable schema consumed by external reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub start_offset: u64,
    pub pages_per_batch: u64,
    pub batch_number: u64,
    pub total_products: u64,
    pub matched_products: u64,
    pub end_offset: u64,
    pub timestamp: DateTime<Utc>,
    pub batch_dir: PathBuf,
}

impl BatchSummary {
    /// Builds the summary for a finished batch
    ///
    /// `matched_products` is clamped to `total_products` so a misbehaving
    /// crawl unit can never push the match count above the product count.
    pub fn new(batch: &BatchDescriptor, result: BatchResult, batch_dir: PathBuf) -> Self {
        if result.matched_products > result.total_products {
            tracing::warn!(
                batch = batch.batch_number,
                "Crawl unit reported {} matched of {} products, clamping",
                result.matched_products,
                result.total_products
            );
        }

        Self {
            start_offset: batch.start_offset,
            pages_per_batch: batch.page_count(),
            batch_number: batch.batch_number,
            total_products: result.total_products,
            matched_products: result.matched_products.min(result.total_products),
            end_offset: batch.end_offset,
            timestamp: Utc::now(),
            batch_dir,
        }
    }

    /// Whether this summary records exactly the range of `batch`
    pub fn covers(&self, batch: &BatchDescriptor) -> bool {
        self.batch_number == batch.batch_number
            && self.start_offset == batch.start_offset
            && self.end_offset == batch.end_offset
    }
}

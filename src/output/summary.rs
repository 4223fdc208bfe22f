//! End-of-run report

use crate::batch::BatchSummary;
use crate::output::GlobalStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report written once every planned batch is recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSummary {
    pub total_products: u64,
    pub matched_products: u64,
    pub match_percentage: f64,
    pub total_batches: u64,
    pub run_started_at: DateTime<Utc>,
    pub completion_date: DateTime<Utc>,
    pub batch_summaries: Vec<BatchSummary>,
}

impl FinalSummary {
    pub fn new(
        stats: &GlobalStats,
        run_started_at: DateTime<Utc>,
        batch_summaries: Vec<BatchSummary>,
    ) -> Self {
        Self {
            total_products: stats.total_products,
            matched_products: stats.matched_products,
            match_percentage: stats.match_percentage(),
            total_batches: stats.batches_completed,
            run_started_at,
            completion_date: Utc::now(),
            batch_summaries,
        }
    }
}

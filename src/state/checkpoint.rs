//! Persisted progress records
//!
//! The global checkpoint tracks the whole run; batch checkpoints track one
//! batch inside its own directory. Both carry a schema version with a serde
//! default so files written by older builds still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk schema version for checkpoint records
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Status of a run as recorded in the global checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Paused,
    Completed,
    CompletedPartial,
    Failed,
}

impl RunStatus {
    /// Returns true if a later run can pick up from this checkpoint
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Durable progress of the whole run
///
/// `next_offset` is always the start offset of the first batch that has not
/// been durably confirmed complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalCheckpoint {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub next_offset: u64,
    pub batches_completed: u64,
    pub run_started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub status: RunStatus,
    #[serde(default)]
    pub config_hash: Option<String>,
}

impl GlobalCheckpoint {
    /// A checkpoint for a run that has not done anything yet
    pub fn fresh(config_hash: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION,
            next_offset: 0,
            batches_completed: 0,
            run_started_at: now,
            last_updated_at: now,
            status: RunStatus::Running,
            config_hash,
        }
    }

    /// Number the next planned batch should get
    pub fn next_batch_number(&self) -> u64 {
        self.batches_completed + 1
    }

    /// Records that the batch ending just before `next_offset` is done
    pub fn advance(&mut self, next_offset: u64) {
        self.next_offset = next_offset;
        self.batches_completed += 1;
        self.touch();
    }

    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }
}

/// Status of a single batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    InProgress,
    Done,
}

/// Progress of one batch, stored in that batch's directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCheckpoint {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub batch_number: u64,
    pub pages_processed: u64,
    pub status: BatchStatus,
}

impl BatchCheckpoint {
    /// A clean checkpoint written when the batch starts
    pub fn started(batch_number: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            batch_number,
            pages_processed: 0,
            status: BatchStatus::InProgress,
        }
    }

    pub fn done(batch_number: u64, pages_processed: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            batch_number,
            pages_processed,
            status: BatchStatus::Done,
        }
    }
}

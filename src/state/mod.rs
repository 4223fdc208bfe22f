//! State module for tracking run progress
//!
//! # Components
//!
//! - `Phase`: the orchestrator state machine's phases and legal transitions
//! - `GlobalCheckpoint`: durable progress of the whole run
//! - `BatchCheckpoint`: durable progress of one batch, scoped to its directory

mod checkpoint;
mod phase;

// Re-export main types
pub use checkpoint::{
    BatchCheckpoint, BatchStatus, GlobalCheckpoint, RunStatus, SCHEMA_VERSION,
};
pub use phase::Phase;

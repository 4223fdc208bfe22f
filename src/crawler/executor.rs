//! Crawl unit interface
//!
//! The orchestrator hands one batch at a time to a [`CrawlExecutor`] and only
//! consumes the two counts it returns. How pages are fetched and matched is
//! entirely up to the implementation.

use crate::batch::{BatchDescriptor, BatchResult};
use std::future::Future;
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors reported by a crawl unit
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// Network or timeout class failure; the batch may be retried as is
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Failure that retrying the same batch will not fix
    #[error("Fatal failure: {0}")]
    Fatal(String),

    /// The cancellation token fired before the batch finished
    #[error("Batch cancelled")]
    Cancelled,
}

impl ExecutorError {
    /// Returns true if the same batch may be attempted again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Runs the crawl for a single batch
///
/// Implementations may be internally concurrent; from the orchestrator's
/// point of view a call is one blocking, possibly long, operation. They
/// should return [`ExecutorError::Cancelled`] promptly once `cancel` fires.
pub trait CrawlExecutor {
    /// Crawls the pages of `batch`, using `batch_dir` as its working directory
    fn execute(
        &self,
        batch: &BatchDescriptor,
        batch_dir: &Path,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<BatchResult, ExecutorError>> + Send;
}

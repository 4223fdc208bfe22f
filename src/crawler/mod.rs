//! Crawler module for running batches of pages
//!
//! This module contains the batch loop and what it drives:
//! - The crawl unit interface and its child-process implementation
//! - Stop and pause control from signals
//! - The orchestrator state machine that ties them to storage

mod command;
mod control;
mod executor;
mod orchestrator;

pub use command::CommandExecutor;
pub use control::RunControl;
pub use executor::{CrawlExecutor, ExecutorError};
pub use orchestrator::{Orchestrator, RunOutcome};

use crate::config::Config;
use crate::monitor::{ResourceMonitor, SystemProbe};
use crate::storage::{open_store, CheckpointStore};
use crate::PagebatchError;

/// Runs a complete batch run with the production components
///
/// This is the main entry point for starting a run. It will:
/// 1. Open the output directory, wiping it first if `fresh`
/// 2. Build the host resource monitor
/// 3. Build the child-process crawl unit
/// 4. Drive the orchestrator until completion, stop, or failure
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the effective configuration, recorded in the checkpoint
/// * `fresh` - Discard previous progress instead of resuming
/// * `control` - Stop and pause switches, usually wired to signals
///
/// # Returns
///
/// * `Ok(RunOutcome)` - The run completed or stopped cleanly
/// * `Err(PagebatchError)` - The run failed; the checkpoint is marked `FAILED`
pub async fn run_batches(
    config: Config,
    config_hash: Option<String>,
    fresh: bool,
    control: RunControl,
) -> Result<RunOutcome, PagebatchError> {
    let mut store = open_store(&config.run.output_dir)?;
    if fresh {
        tracing::info!(
            "Discarding previous progress in {}",
            config.run.output_dir.display()
        );
        store.reset()?;
    }

    let probe = SystemProbe::new(&config.run.output_dir);
    let monitor = ResourceMonitor::new(Box::new(probe), config.resources.clone());
    let executor = CommandExecutor::new(&config.executor, config.run.batch_size);

    let mut orchestrator =
        Orchestrator::new(config.run, Box::new(store), executor, monitor, control);
    if let Some(hash) = config_hash {
        orchestrator = orchestrator.with_config_hash(hash);
    }

    orchestrator.run().await
}

//! Batch orchestrator - the resumable batch loop
//!
//! This module contains the state machine that ties planning, resource
//! monitoring, crawl execution and checkpointing together:
//!
//! ```text
//! INIT -> RUNNING_BATCH <-> PAUSED_RESOURCE
//!              |
//!              v
//!        CHECKPOINTING -> RUNNING_BATCH | COMPLETED
//!
//! RUNNING_BATCH | PAUSED_RESOURCE | CHECKPOINTING -> STOPPING -> COMPLETED_PARTIAL
//! any active phase -> FAILED
//! ```
//!
//! A batch's summary is always durably written before the global checkpoint
//! advances past it, so a crash at any point either leaves the batch fully
//! recorded or makes the next run execute it again.

use crate::batch::{plan, BatchDescriptor, BatchResult, BatchSummary};
use crate::config::{RunConfig, StopPolicy};
use crate::crawler::control::RunControl;
use crate::crawler::executor::{CrawlExecutor, ExecutorError};
use crate::monitor::ResourceMonitor;
use crate::output::{fold, recompute, FinalSummary, GlobalStats};
use crate::state::{BatchCheckpoint, GlobalCheckpoint, Phase, RunStatus};
use crate::storage::{CheckpointStore, StoreError};
use crate::{PagebatchError, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a run ended without a fatal error
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `Completed` or `CompletedPartial`
    pub phase: Phase,

    /// Totals over every batch recorded so far
    pub stats: GlobalStats,

    /// The checkpoint as last persisted
    pub checkpoint: GlobalCheckpoint,
}

impl RunOutcome {
    /// Returns true if every planned batch was recorded
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }
}

/// Everything the loop knows about the current run
///
/// Owned by [`Orchestrator::run`] and handed to each phase handler.
#[derive(Debug)]
struct RunState {
    phase: Phase,

    /// Working copy, ahead of `durable` between a batch and its checkpoint
    checkpoint: GlobalCheckpoint,

    /// Last checkpoint known to be on disk
    durable: GlobalCheckpoint,

    /// Whether `checkpoint` came from INIT; before that nothing may be persisted
    loaded: bool,

    stats: GlobalStats,
    pending: VecDeque<BatchDescriptor>,

    /// Attempts made on the batch at the front of `pending`
    attempt: u32,
}

impl RunState {
    fn new(config_hash: Option<String>) -> Self {
        let checkpoint = GlobalCheckpoint::fresh(config_hash);
        Self {
            phase: Phase::Init,
            durable: checkpoint.clone(),
            checkpoint,
            loaded: false,
            stats: GlobalStats::default(),
            pending: VecDeque::new(),
            attempt: 0,
        }
    }

    fn transition(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(PagebatchError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        if self.phase != next {
            debug!("Phase {} -> {}", self.phase, next);
        }
        self.phase = next;
        Ok(())
    }

    fn outcome(&self) -> RunOutcome {
        RunOutcome {
            phase: self.phase,
            stats: self.stats,
            checkpoint: self.durable.clone(),
        }
    }
}

/// Drives a run from its checkpoint to completion, stop, or failure
pub struct Orchestrator<E> {
    config: RunConfig,
    config_hash: Option<String>,
    store: Box<dyn CheckpointStore + Send>,
    executor: E,
    monitor: ResourceMonitor,
    control: RunControl,
}

impl<E: CrawlExecutor> Orchestrator<E> {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - Page range, batch size, retry and stop settings
    /// * `store` - Durable home of checkpoints and summaries
    /// * `executor` - The crawl unit that runs each batch
    /// * `monitor` - Resource monitor consulted before each batch
    /// * `control` - Stop and pause switches
    pub fn new(
        config: RunConfig,
        store: Box<dyn CheckpointStore + Send>,
        executor: E,
        monitor: ResourceMonitor,
        control: RunControl,
    ) -> Self {
        Self {
            config,
            config_hash: None,
            store,
            executor,
            monitor,
            control,
        }
    }

    /// Records the configuration hash in new checkpoints and checks it on resume
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = Some(config_hash.into());
        self
    }

    /// Runs the batch loop until completion, a stop request, or a fatal error
    ///
    /// On error the last durable checkpoint is marked `FAILED` with its
    /// `next_offset` untouched, so a later run resumes the unfinished batch.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        let mut run = RunState::new(self.config_hash.clone());

        loop {
            let next = match run.phase {
                Phase::Init => self.init(&mut run),
                Phase::RunningBatch => self.run_batch(&mut run).await,
                Phase::PausedResource => self.wait_paused(&mut run).await,
                Phase::Checkpointing => self.checkpoint(&mut run).await,
                Phase::Stopping => self.stop(&mut run),
                Phase::Completed | Phase::CompletedPartial | Phase::Failed => {
                    return Ok(run.outcome());
                }
            };

            if let Err(e) = next.and_then(|phase| run.transition(phase)) {
                self.fail(&mut run, &e);
                return Err(e);
            }
        }
    }

    // ===== Phase Handlers =====

    /// Loads or creates the checkpoint and plans the remaining batches
    fn init(&mut self, run: &mut RunState) -> Result<Phase> {
        let checkpoint = match self.store.load_global()? {
            Some(checkpoint) => {
                info!(
                    "Resuming from checkpoint: next offset {}, {} batches completed, status {:?}",
                    checkpoint.next_offset, checkpoint.batches_completed, checkpoint.status
                );
                let recorded = checkpoint.config_hash.as_deref();
                let current = self.config_hash.as_deref();
                if let (Some(recorded), Some(current)) = (recorded, current) {
                    if recorded != current {
                        warn!("Configuration changed since this run started");
                    }
                }
                checkpoint
            }
            None => {
                info!("No checkpoint found, starting from offset 0");
                GlobalCheckpoint::fresh(self.config_hash.clone())
            }
        };

        let batches = plan(
            self.config.total_pages,
            self.config.pages_per_batch,
            checkpoint.next_offset,
            checkpoint.next_batch_number(),
        )?;

        // Summaries past `batches_completed` belong to a batch whose checkpoint
        // never landed; it is folded again when that batch re-runs.
        let summaries = self.store.load_summaries()?;
        let stats = recompute(
            summaries
                .iter()
                .filter(|s| s.batch_number <= checkpoint.batches_completed),
        );
        if stats.batches_completed != checkpoint.batches_completed {
            return Err(PagebatchError::MissingSummaries {
                expected: checkpoint.batches_completed,
                found: stats.batches_completed,
            });
        }

        run.checkpoint = checkpoint.clone();
        run.durable = checkpoint;
        run.loaded = true;
        run.stats = stats;
        run.pending = batches.into();

        if run.pending.is_empty() {
            info!(
                "Nothing left to crawl: offset {} of {}",
                run.checkpoint.next_offset, self.config.total_pages
            );
            return self.complete(run);
        }

        info!(
            "Planned {} batches of up to {} pages covering offsets {}-{}",
            run.pending.len(),
            self.config.pages_per_batch,
            run.checkpoint.next_offset,
            self.config.total_pages - 1
        );

        run.checkpoint.set_status(RunStatus::Running);
        self.persist(run)?;
        Ok(Phase::RunningBatch)
    }

    /// Starts the next batch unless stopped or under pressure
    async fn run_batch(&mut self, run: &mut RunState) -> Result<Phase> {
        if self.control.is_stop_requested() {
            return Ok(Phase::Stopping);
        }

        if let Some(reason) = self.pause_reason() {
            warn!("Pausing before next batch: {}", reason);
            return Ok(Phase::PausedResource);
        }

        let Some(batch) = run.pending.front().cloned() else {
            return Ok(Phase::Checkpointing);
        };
        let batch_dir = self.store.batch_dir(batch.batch_number);
        run.attempt += 1;

        info!(
            batch = batch.batch_number,
            start = batch.start_offset,
            end = batch.end_offset,
            attempt = run.attempt,
            "Running batch {} ({} pages, offsets {}-{})",
            batch.batch_number,
            batch.page_count(),
            batch.start_offset,
            batch.end_offset
        );

        self.store
            .save_batch(&BatchCheckpoint::started(batch.batch_number))?;

        let Some(result) = self.execute(&batch, &batch_dir).await else {
            info!(
                batch = batch.batch_number,
                "Batch abandoned on stop request; it will run again on resume"
            );
            return Ok(Phase::Stopping);
        };

        match result {
            Ok(result) => {
                self.record(run, &batch, result)?;
                run.pending.pop_front();
                run.attempt = 0;
                Ok(Phase::Checkpointing)
            }
            Err(ExecutorError::Cancelled) if self.control.is_stop_requested() => {
                info!(
                    batch = batch.batch_number,
                    "Batch cancelled on stop request; it will run again on resume"
                );
                Ok(Phase::Stopping)
            }
            Err(e) if e.is_transient() && run.attempt < self.config.max_batch_attempts => {
                warn!(
                    batch = batch.batch_number,
                    attempt = run.attempt,
                    "Batch {} failed ({}), retrying in {}s",
                    batch.batch_number,
                    e,
                    self.config.retry_delay_secs
                );
                if self.sleep_unless_stopped(self.config.retry_delay()).await {
                    Ok(Phase::RunningBatch)
                } else {
                    Ok(Phase::Stopping)
                }
            }
            Err(source) => Err(PagebatchError::BatchFailed {
                batch_number: batch.batch_number,
                attempts: run.attempt,
                source,
            }),
        }
    }

    /// Waits out resource pressure or an operator pause
    async fn wait_paused(&mut self, run: &mut RunState) -> Result<Phase> {
        if run.checkpoint.status != RunStatus::Paused {
            run.checkpoint.set_status(RunStatus::Paused);
            self.persist(run)?;
        }

        let mut interval = self.monitor.config().pause_duration();
        if interval.is_zero() {
            interval = Duration::from_secs(1);
        }

        if !self.sleep_unless_stopped(interval).await {
            info!("Stop requested while paused");
            return Ok(Phase::Stopping);
        }

        match self.pause_reason() {
            Some(reason) => {
                info!("Still paused: {}", reason);
                Ok(Phase::PausedResource)
            }
            None => {
                info!("Pressure cleared, resuming");
                run.checkpoint.set_status(RunStatus::Running);
                self.persist(run)?;
                Ok(Phase::RunningBatch)
            }
        }
    }

    /// Persists the advanced checkpoint after a recorded batch
    async fn checkpoint(&mut self, run: &mut RunState) -> Result<Phase> {
        run.checkpoint.set_status(RunStatus::Running);
        self.persist(run)?;

        if let Err(e) = self.store.save_stats(&run.stats) {
            warn!("Could not write stats report: {}", e);
        }

        info!(
            "Checkpoint saved: next offset {} of {}, {} batches, {} products ({} matched)",
            run.checkpoint.next_offset,
            self.config.total_pages,
            run.checkpoint.batches_completed,
            run.stats.total_products,
            run.stats.matched_products
        );

        if run.pending.is_empty() {
            return self.complete(run);
        }

        if self.control.is_stop_requested() {
            return Ok(Phase::Stopping);
        }

        let pause = self.config.inter_batch_pause();
        if !pause.is_zero() {
            info!("Pausing {}s between batches", pause.as_secs());
            if !self.sleep_unless_stopped(pause).await {
                return Ok(Phase::Stopping);
            }
        }

        Ok(Phase::RunningBatch)
    }

    /// Leaves the checkpoint resumable after a stop request
    fn stop(&mut self, run: &mut RunState) -> Result<Phase> {
        run.checkpoint.set_status(RunStatus::CompletedPartial);
        self.persist(run)?;
        info!(
            "Run stopped at offset {} of {} after {} batches; resume to continue",
            run.checkpoint.next_offset, self.config.total_pages, run.checkpoint.batches_completed
        );
        Ok(Phase::CompletedPartial)
    }

    /// Verifies stats against disk and marks the run complete
    fn complete(&mut self, run: &mut RunState) -> Result<Phase> {
        let summaries = self.store.load_summaries()?;
        let recomputed = recompute(&summaries);
        if recomputed != run.stats {
            return Err(PagebatchError::StatsDivergence {
                folded: run.stats,
                recomputed,
            });
        }

        run.checkpoint.set_status(RunStatus::Completed);
        self.persist(run)?;

        let report = FinalSummary::new(&run.stats, run.checkpoint.run_started_at, summaries);
        if let Err(e) = self.store.save_final_summary(&report) {
            warn!("Could not write final summary: {}", e);
        }

        info!(
            "All pages processed: {} batches, {} products, {} matched ({:.2}%)",
            run.stats.batches_completed,
            run.stats.total_products,
            run.stats.matched_products,
            run.stats.match_percentage()
        );
        Ok(Phase::Completed)
    }

    /// Marks the last durable checkpoint as failed
    fn fail(&mut self, run: &mut RunState, err: &PagebatchError) {
        match run.pending.front() {
            Some(batch) => error!(
                phase = %run.phase,
                batch = batch.batch_number,
                start = batch.start_offset,
                end = batch.end_offset,
                "Run failed: {}",
                err
            ),
            None => error!(phase = %run.phase, "Run failed: {}", err),
        }
        run.phase = Phase::Failed;

        if !run.loaded {
            return;
        }

        let mut checkpoint = run.durable.clone();
        checkpoint.set_status(RunStatus::Failed);
        match self.store.save_global(&checkpoint) {
            Ok(()) => run.durable = checkpoint,
            Err(e) => error!("Could not record failure in checkpoint: {}", e),
        }
    }

    // ===== Helpers =====

    /// Runs the crawl unit; `None` means the batch was abandoned on stop
    async fn execute(
        &self,
        batch: &BatchDescriptor,
        batch_dir: &std::path::Path,
    ) -> Option<std::result::Result<BatchResult, ExecutorError>> {
        match self.config.stop_policy {
            StopPolicy::FinishBatch => Some(
                self.executor
                    .execute(batch, batch_dir, CancellationToken::new())
                    .await,
            ),
            StopPolicy::CancelBatch => {
                let token = self.control.cancel_token().child_token();
                tokio::select! {
                    result = self.executor.execute(batch, batch_dir, token) => Some(result),
                    _ = self.control.stopped() => None,
                }
            }
        }
    }

    /// Writes the batch's records in order: checkpoint, summary, stats
    fn record(
        &mut self,
        run: &mut RunState,
        batch: &BatchDescriptor,
        result: BatchResult,
    ) -> Result<()> {
        let batch_dir = self.store.batch_dir(batch.batch_number);

        self.store
            .save_batch(&BatchCheckpoint::done(batch.batch_number, batch.page_count()))?;

        let summary = BatchSummary::new(batch, result, batch_dir);
        let summary = match self.store.save_summary(&summary) {
            Ok(()) => summary,
            Err(StoreError::DuplicateSummary { batch_number }) => {
                match self.store.load_summary(batch_number)? {
                    Some(existing) if existing.covers(batch) => {
                        warn!(
                            batch = batch_number,
                            "Batch was already summarized before an interruption; keeping the recorded summary"
                        );
                        existing
                    }
                    _ => return Err(StoreError::DuplicateSummary { batch_number }.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        run.stats = fold(run.stats, &summary);
        run.checkpoint.advance(batch.next_offset());

        info!(
            batch = batch.batch_number,
            "Batch {} completed: {} products, {} matched",
            batch.batch_number,
            summary.total_products,
            summary.matched_products
        );
        Ok(())
    }

    /// Saves the working checkpoint and makes it the durable one
    fn persist(&mut self, run: &mut RunState) -> Result<()> {
        self.store.save_global(&run.checkpoint)?;
        run.durable = run.checkpoint.clone();
        Ok(())
    }

    fn pause_reason(&mut self) -> Option<String> {
        if self.control.is_paused() {
            return Some("paused by operator".to_string());
        }
        self.monitor.check().map(|pressure| pressure.to_string())
    }

    /// Sleeps for `duration`; returns false if a stop arrived first
    async fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.control.stopped() => false,
        }
    }
}

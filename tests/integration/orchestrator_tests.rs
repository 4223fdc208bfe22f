//! Integration tests for the batch orchestrator
//!
//! These tests drive full runs against a real file store in a temporary
//! directory, with a scripted crawl unit and a scripted resource probe
//! standing in for the external command and the host. Time is paused so
//! retry delays and resource pauses elapse instantly.

use pagebatch::batch::{BatchDescriptor, BatchResult, BatchSummary};
use pagebatch::config::{ResourceConfig, RunConfig, StopPolicy};
use pagebatch::crawler::{CrawlExecutor, ExecutorError, Orchestrator, RunControl, RunOutcome};
use pagebatch::monitor::{MonitorError, ResourceMonitor, ResourceProbe};
use pagebatch::output::{recompute, FinalSummary, GlobalStats};
use pagebatch::state::{BatchCheckpoint, GlobalCheckpoint, Phase, RunStatus};
use pagebatch::storage::{CheckpointStore, FileStore, StoreError, StoreResult};
use pagebatch::PagebatchError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ===== Scripted crawl unit =====

/// What the scripted crawl unit does on its next call
#[derive(Debug, Clone)]
enum Step {
    /// Succeed with these counts
    Succeed(u64, u64),
    /// Fail with this error
    Fail(ExecutorError),
    /// Request a stop, then succeed with the default counts
    StopThenSucceed,
    /// Request a stop, then wait for cancellation
    StopThenHang,
}

/// Replays scripted steps; once the script runs out every batch succeeds
/// with three products per page, one of them matched
#[derive(Clone)]
struct ScriptedExecutor {
    steps: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<Mutex<Vec<BatchDescriptor>>>,
    control: RunControl,
}

impl ScriptedExecutor {
    fn new(steps: Vec<Step>, control: &RunControl) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
            control: control.clone(),
        }
    }

    fn calls(&self) -> Vec<BatchDescriptor> {
        self.calls.lock().unwrap().clone()
    }

    fn ranges(&self) -> Vec<(u64, u64, u64)> {
        self.calls()
            .iter()
            .map(|b| (b.batch_number, b.start_offset, b.end_offset))
            .collect()
    }

    fn next_step(&self, batch: &BatchDescriptor) -> Step {
        self.calls.lock().unwrap().push(batch.clone());
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Succeed(batch.page_count() * 3, batch.page_count()))
    }
}

impl CrawlExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        batch: &BatchDescriptor,
        _batch_dir: &Path,
        cancel: CancellationToken,
    ) -> Result<BatchResult, ExecutorError> {
        match self.next_step(batch) {
            Step::Succeed(total_products, matched_products) => Ok(BatchResult {
                total_products,
                matched_products,
            }),
            Step::Fail(e) => Err(e),
            Step::StopThenSucceed => {
                self.control.request_stop();
                Ok(BatchResult {
                    total_products: batch.page_count() * 3,
                    matched_products: batch.page_count(),
                })
            }
            Step::StopThenHang => {
                self.control.request_stop();
                cancel.cancelled().await;
                Err(ExecutorError::Cancelled)
            }
        }
    }
}

// ===== Scripted resource probe =====

/// Replays memory readings; afterwards memory sits at 10%
struct ScriptedProbe {
    memory: VecDeque<f64>,
    samples: Arc<Mutex<usize>>,
    stop_on_pressure: Option<RunControl>,
}

impl ScriptedProbe {
    fn idle() -> Self {
        Self::with_memory(vec![])
    }

    fn with_memory(memory: Vec<f64>) -> Self {
        Self {
            memory: memory.into(),
            samples: Arc::new(Mutex::new(0)),
            stop_on_pressure: None,
        }
    }
}

impl ResourceProbe for ScriptedProbe {
    fn memory_percent(&mut self) -> Result<f64, MonitorError> {
        *self.samples.lock().unwrap() += 1;
        let memory_percent = self.memory.pop_front().unwrap_or(10.0);
        if memory_percent > 90.0 {
            if let Some(control) = &self.stop_on_pressure {
                control.request_stop();
            }
        }
        Ok(memory_percent)
    }

    fn disk_percent(&mut self) -> Result<f64, MonitorError> {
        Ok(20.0)
    }
}

// ===== Store that fails on demand =====

/// File store whose `fail_on`-th global checkpoint save fails
struct FlakyStore {
    inner: FileStore,
    global_saves: usize,
    fail_on: usize,
}

impl CheckpointStore for FlakyStore {
    fn load_global(&self) -> StoreResult<Option<GlobalCheckpoint>> {
        self.inner.load_global()
    }

    fn save_global(&mut self, checkpoint: &GlobalCheckpoint) -> StoreResult<()> {
        self.global_saves += 1;
        if self.global_saves == self.fail_on {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.save_global(checkpoint)
    }

    fn batch_dir(&self, batch_number: u64) -> PathBuf {
        self.inner.batch_dir(batch_number)
    }

    fn load_batch(&self, batch_number: u64) -> StoreResult<Option<BatchCheckpoint>> {
        self.inner.load_batch(batch_number)
    }

    fn save_batch(&mut self, checkpoint: &BatchCheckpoint) -> StoreResult<()> {
        self.inner.save_batch(checkpoint)
    }

    fn load_summary(&self, batch_number: u64) -> StoreResult<Option<BatchSummary>> {
        self.inner.load_summary(batch_number)
    }

    fn save_summary(&mut self, summary: &BatchSummary) -> StoreResult<()> {
        self.inner.save_summary(summary)
    }

    fn load_summaries(&self) -> StoreResult<Vec<BatchSummary>> {
        self.inner.load_summaries()
    }

    fn save_stats(&mut self, stats: &GlobalStats) -> StoreResult<()> {
        self.inner.save_stats(stats)
    }

    fn save_final_summary(&mut self, summary: &FinalSummary) -> StoreResult<()> {
        self.inner.save_final_summary(summary)
    }

    fn reset(&mut self) -> StoreResult<()> {
        self.inner.reset()
    }
}

// ===== Fixtures =====

fn run_config(dir: &Path, total_pages: u64, pages_per_batch: u64) -> RunConfig {
    RunConfig {
        total_pages,
        pages_per_batch,
        batch_size: 500,
        output_dir: dir.to_path_buf(),
        inter_batch_pause_secs: 0,
        max_batch_attempts: 3,
        retry_delay_secs: 30,
        stop_policy: StopPolicy::FinishBatch,
    }
}

fn resource_config() -> ResourceConfig {
    ResourceConfig {
        enabled: true,
        max_memory_percent: 90.0,
        max_disk_percent: 90.0,
        pause_secs: 60,
    }
}

fn store(dir: &Path) -> FileStore {
    FileStore::open(dir).unwrap()
}

fn orchestrator(
    config: RunConfig,
    executor: &ScriptedExecutor,
    probe: ScriptedProbe,
    control: &RunControl,
) -> Orchestrator<ScriptedExecutor> {
    let store = store(&config.output_dir);
    let monitor = ResourceMonitor::new(Box::new(probe), resource_config());
    Orchestrator::new(
        config,
        Box::new(store),
        executor.clone(),
        monitor,
        control.clone(),
    )
}

async fn run_idle(
    config: RunConfig,
    executor: &ScriptedExecutor,
    control: &RunControl,
) -> pagebatch::Result<RunOutcome> {
    orchestrator(config, executor, ScriptedProbe::idle(), control)
        .run()
        .await
}

fn descriptor(batch_number: u64, start_offset: u64, end_offset: u64) -> BatchDescriptor {
    BatchDescriptor {
        batch_number,
        start_offset,
        end_offset,
        created_at: chrono::Utc::now(),
    }
}

/// Writes a summary as an earlier run would have
fn write_summary(dir: &Path, batch: &BatchDescriptor, total: u64, matched: u64) -> BatchSummary {
    let mut store = store(dir);
    let summary = BatchSummary::new(
        batch,
        BatchResult {
            total_products: total,
            matched_products: matched,
        },
        store.batch_dir(batch.batch_number),
    );
    store.save_summary(&summary).unwrap();
    summary
}

/// Writes a global checkpoint as an earlier run would have
fn write_checkpoint(dir: &Path, advances: &[u64], status: RunStatus) -> GlobalCheckpoint {
    let mut checkpoint = GlobalCheckpoint::fresh(None);
    for next_offset in advances {
        checkpoint.advance(*next_offset);
    }
    checkpoint.set_status(status);
    store(dir).save_global(&checkpoint).unwrap();
    checkpoint
}

fn saved_checkpoint(dir: &Path) -> GlobalCheckpoint {
    store(dir).load_global().unwrap().unwrap()
}

// ===== Tests =====

#[tokio::test(start_paused = true)]
async fn test_full_run_records_every_batch() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let outcome = run_idle(run_config(dir.path(), 20, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(
        executor.ranges(),
        vec![(1, 0, 4), (2, 5, 9), (3, 10, 14), (4, 15, 19)]
    );

    let summaries = store(dir.path()).load_summaries().unwrap();
    assert_eq!(summaries.len(), 4);
    assert_eq!(recompute(&summaries), outcome.stats);
    assert_eq!(
        outcome.stats,
        GlobalStats {
            total_products: 60,
            matched_products: 20,
            batches_completed: 4,
        }
    );

    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::Completed);
    assert_eq!(checkpoint.next_offset, 20);
    assert_eq!(checkpoint.batches_completed, 4);
    assert!(dir.path().join("final_summary.json").exists());
    assert!(dir.path().join("global_stats.json").exists());

    let batch = store(dir.path()).load_batch(4).unwrap().unwrap();
    assert_eq!(batch.pages_processed, 5);
}

#[tokio::test(start_paused = true)]
async fn test_last_batch_is_truncated() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let outcome = run_idle(run_config(dir.path(), 12, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(executor.ranges(), vec![(1, 0, 4), (2, 5, 9), (3, 10, 11)]);
    let last = store(dir.path()).load_summary(3).unwrap().unwrap();
    assert_eq!(last.pages_per_batch, 2);
}

#[tokio::test(start_paused = true)]
async fn test_resume_continues_from_checkpoint() {
    let dir = TempDir::new().unwrap();
    write_summary(dir.path(), &descriptor(1, 0, 4), 15, 5);
    write_summary(dir.path(), &descriptor(2, 5, 9), 15, 5);
    write_checkpoint(dir.path(), &[5, 10], RunStatus::CompletedPartial);

    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let outcome = run_idle(run_config(dir.path(), 20, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(executor.ranges(), vec![(3, 10, 14), (4, 15, 19)]);
    assert_eq!(outcome.stats.batches_completed, 4);
    assert_eq!(outcome.stats.total_products, 60);
}

#[tokio::test(start_paused = true)]
async fn test_completed_run_has_nothing_to_do() {
    let dir = TempDir::new().unwrap();
    write_summary(dir.path(), &descriptor(1, 0, 9), 30, 10);
    write_checkpoint(dir.path(), &[10], RunStatus::Completed);

    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let outcome = run_idle(run_config(dir.path(), 10, 10), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert!(executor.calls().is_empty());
    assert_eq!(outcome.stats.total_products, 30);
}

#[tokio::test(start_paused = true)]
async fn test_crash_between_summary_and_checkpoint_keeps_recorded_summary() {
    let dir = TempDir::new().unwrap();
    // The summary landed but the checkpoint never advanced past batch 1
    write_summary(dir.path(), &descriptor(1, 0, 4), 100, 50);
    write_checkpoint(dir.path(), &[], RunStatus::Running);

    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let outcome = run_idle(run_config(dir.path(), 10, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(executor.ranges(), vec![(1, 0, 4), (2, 5, 9)]);

    let summaries = store(dir.path()).load_summaries().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].total_products, 100);
    assert_eq!(outcome.stats.total_products, 115);
    assert_eq!(outcome.stats.matched_products, 55);
}

#[tokio::test(start_paused = true)]
async fn test_conflicting_summary_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_summary(dir.path(), &descriptor(1, 0, 9), 30, 10);

    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let err = run_idle(run_config(dir.path(), 10, 5), &executor, &control)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PagebatchError::Storage(StoreError::DuplicateSummary { batch_number: 1 })
    ));
    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::Failed);
    assert_eq!(checkpoint.next_offset, 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_summaries_are_fatal() {
    let dir = TempDir::new().unwrap();
    write_checkpoint(dir.path(), &[5, 10], RunStatus::Running);

    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let err = run_idle(run_config(dir.path(), 20, 5), &executor, &control)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PagebatchError::MissingSummaries {
            expected: 2,
            found: 0
        }
    ));
    assert!(executor.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_resume_beyond_total_is_fatal_before_any_batch() {
    let dir = TempDir::new().unwrap();
    write_checkpoint(dir.path(), &[30], RunStatus::CompletedPartial);

    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    let err = run_idle(run_config(dir.path(), 20, 5), &executor, &control)
        .await
        .unwrap_err();

    assert!(matches!(err, PagebatchError::Plan(_)));
    assert!(executor.calls().is_empty());
    // Nothing was loaded successfully, so the checkpoint is left as found
    assert_eq!(
        saved_checkpoint(dir.path()).status,
        RunStatus::CompletedPartial
    );
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(
        vec![
            Step::Fail(ExecutorError::Transient("timeout".to_string())),
            Step::Fail(ExecutorError::Transient("timeout".to_string())),
        ],
        &control,
    );

    let started = tokio::time::Instant::now();
    let outcome = run_idle(run_config(dir.path(), 10, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(
        executor.ranges(),
        vec![(1, 0, 4), (1, 0, 4), (1, 0, 4), (2, 5, 9)]
    );
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(store(dir.path()).load_summaries().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fail_without_advancing() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(
        vec![
            Step::Succeed(15, 5),
            Step::Fail(ExecutorError::Transient("timeout".to_string())),
            Step::Fail(ExecutorError::Transient("timeout".to_string())),
            Step::Fail(ExecutorError::Transient("timeout".to_string())),
        ],
        &control,
    );

    let err = run_idle(run_config(dir.path(), 20, 5), &executor, &control)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PagebatchError::BatchFailed {
            batch_number: 2,
            attempts: 3,
            ..
        }
    ));

    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::Failed);
    assert_eq!(checkpoint.next_offset, 5);
    assert_eq!(checkpoint.batches_completed, 1);
    assert!(checkpoint.status.is_resumable());
    assert!(store(dir.path()).load_summary(2).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_fatal_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(
        vec![Step::Fail(ExecutorError::Fatal("bad input".to_string()))],
        &control,
    );

    let err = run_idle(run_config(dir.path(), 10, 5), &executor, &control)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PagebatchError::BatchFailed {
            batch_number: 1,
            attempts: 1,
            ..
        }
    ));
    assert_eq!(executor.calls().len(), 1);
    assert_eq!(saved_checkpoint(dir.path()).status, RunStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_write_failure_keeps_previous_checkpoint() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    let monitor = ResourceMonitor::new(Box::new(ScriptedProbe::idle()), resource_config());

    // Save 1 marks the run RUNNING, save 2 would advance past batch 1
    let flaky = FlakyStore {
        inner: store(dir.path()),
        global_saves: 0,
        fail_on: 2,
    };
    let err = Orchestrator::new(
        run_config(dir.path(), 10, 5),
        Box::new(flaky),
        executor.clone(),
        monitor,
        control.clone(),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, PagebatchError::Storage(StoreError::Io(_))));
    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::Failed);
    assert_eq!(checkpoint.next_offset, 0);
    assert_eq!(checkpoint.batches_completed, 0);

    // The next run replays batch 1 and keeps its recorded summary
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    let outcome = run_idle(run_config(dir.path(), 10, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(executor.ranges(), vec![(1, 0, 4), (2, 5, 9)]);
    assert_eq!(outcome.stats.batches_completed, 2);
    assert_eq!(outcome.stats.total_products, 30);
}

#[tokio::test(start_paused = true)]
async fn test_stop_with_finish_batch_records_in_flight_batch() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![Step::StopThenSucceed], &control);

    let outcome = run_idle(run_config(dir.path(), 20, 5), &executor, &control)
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::CompletedPartial);
    assert_eq!(executor.calls().len(), 1);

    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::CompletedPartial);
    assert_eq!(checkpoint.next_offset, 5);
    assert_eq!(checkpoint.batches_completed, 1);
    assert!(store(dir.path()).load_summary(1).unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_stop_with_cancel_batch_records_nothing() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![Step::StopThenHang], &control);
    let mut config = run_config(dir.path(), 20, 5);
    config.stop_policy = StopPolicy::CancelBatch;

    let outcome = orchestrator(config, &executor, ScriptedProbe::idle(), &control)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::CompletedPartial);
    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::CompletedPartial);
    assert_eq!(checkpoint.next_offset, 0);
    assert!(store(dir.path()).load_summaries().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_resource_pause() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    let mut probe = ScriptedProbe::with_memory(vec![10.0, 95.0]);
    probe.stop_on_pressure = Some(control.clone());

    let outcome = orchestrator(run_config(dir.path(), 20, 5), &executor, probe, &control)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::CompletedPartial);
    assert_eq!(executor.calls().len(), 1);

    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::CompletedPartial);
    assert_eq!(checkpoint.next_offset, 5);
}

#[tokio::test(start_paused = true)]
async fn test_stop_signal_interrupts_resource_pause() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    let probe = ScriptedProbe::with_memory(vec![10.0, 95.0, 95.0, 95.0]);
    let config = run_config(dir.path(), 20, 5);

    // Batch 1 runs at once; the stop lands halfway through the first 60s pause
    let stopper = control.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        stopper.request_stop();
    });

    let started = tokio::time::Instant::now();
    let outcome = orchestrator(config, &executor, probe, &control)
        .run()
        .await
        .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(60));
    assert_eq!(outcome.phase, Phase::CompletedPartial);
    assert_eq!(executor.calls().len(), 1);

    let checkpoint = saved_checkpoint(dir.path());
    assert_eq!(checkpoint.status, RunStatus::CompletedPartial);
    assert_eq!(checkpoint.next_offset, 5);
    assert_eq!(checkpoint.batches_completed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_pressure_pauses_until_cleared() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    let probe = ScriptedProbe::with_memory(vec![95.0, 95.0, 10.0]);
    let samples = probe.samples.clone();

    let started = tokio::time::Instant::now();
    let outcome = orchestrator(run_config(dir.path(), 10, 5), &executor, probe, &control)
        .run()
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(executor.calls().len(), 2);
    assert!(started.elapsed() >= Duration::from_secs(120));
    // Two pressured, one clearing, then one before each batch
    assert_eq!(*samples.lock().unwrap(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_monitoring_never_samples() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    let probe = ScriptedProbe::with_memory(vec![99.0; 10]);
    let samples = probe.samples.clone();

    let mut resources = resource_config();
    resources.enabled = false;
    let monitor = ResourceMonitor::new(Box::new(probe), resources);

    let outcome = Orchestrator::new(
        run_config(dir.path(), 10, 5),
        Box::new(store(dir.path())),
        executor.clone(),
        monitor,
        control.clone(),
    )
    .run()
    .await
    .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(*samples.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_operator_pause_holds_batches() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);
    control.set_paused(true);

    let resumer = control.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(90)).await;
        resumer.set_paused(false);
    });

    let started = tokio::time::Instant::now();
    let outcome = run_idle(run_config(dir.path(), 10, 5), &executor, &control)
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert!(started.elapsed() >= Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_config_hash_is_recorded() {
    let dir = TempDir::new().unwrap();
    let control = RunControl::new();
    let executor = ScriptedExecutor::new(vec![], &control);

    orchestrator(run_config(dir.path(), 5, 5), &executor, ScriptedProbe::idle(), &control)
        .with_config_hash("abc123")
        .run()
        .await
        .unwrap();

    assert_eq!(
        saved_checkpoint(dir.path()).config_hash.as_deref(),
        Some("abc123")
    );
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Pagebatch
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub run: RunConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    pub executor: ExecutorConfig,
}

/// Batch loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Total number of pages in the source
    #[serde(rename = "total-pages", default = "default_total_pages")]
    pub total_pages: u64,

    /// Pages handed to the crawl unit per batch
    #[serde(rename = "pages-per-batch", default = "default_pages_per_batch")]
    pub pages_per_batch: u64,

    /// Products per output file, passed through to the crawl unit
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u64,

    /// Directory holding checkpoints, summaries and batch directories
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Seconds to wait between two batches
    #[serde(rename = "inter-batch-pause-secs", default)]
    pub inter_batch_pause_secs: u64,

    /// Attempts per batch before a transient failure becomes fatal
    #[serde(rename = "max-batch-attempts", default = "default_max_batch_attempts")]
    pub max_batch_attempts: u32,

    /// Seconds to wait before retrying a failed batch
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// What to do with an in-flight batch when a stop signal arrives
    #[serde(rename = "stop-policy", default)]
    pub stop_policy: StopPolicy,
}

impl RunConfig {
    pub fn inter_batch_pause(&self) -> Duration {
        Duration::from_secs(self.inter_batch_pause_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Stop handling for a batch that is already running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopPolicy {
    /// Let the batch finish and record it, then stop
    #[default]
    FinishBatch,

    /// Drop the batch; nothing of it is recorded
    CancelBatch,
}

/// Host resource monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Whether to sample host resources before each batch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Memory utilization above which the run pauses
    #[serde(rename = "max-memory-percent", default = "default_threshold")]
    pub max_memory_percent: f64,

    /// Disk utilization above which the run pauses
    #[serde(rename = "max-disk-percent", default = "default_threshold")]
    pub max_disk_percent: f64,

    /// Seconds to wait before re-sampling while paused
    #[serde(rename = "pause-secs", default = "default_pause_secs")]
    pub pause_secs: u64,
}

impl ResourceConfig {
    pub fn pause_duration(&self) -> Duration {
        Duration::from_secs(self.pause_secs)
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_memory_percent: default_threshold(),
            max_disk_percent: default_threshold(),
            pause_secs: default_pause_secs(),
        }
    }
}

/// External crawl command configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
    /// Program to launch for each batch
    pub program: String,

    /// Argument templates; see `crawler::CommandExecutor` for placeholders
    #[serde(default)]
    pub args: Vec<String>,

    /// File the command writes its counts to, relative to the batch directory
    #[serde(rename = "result-file", default = "default_result_file")]
    pub result_file: String,
}

fn default_total_pages() -> u64 {
    3094
}

fn default_pages_per_batch() -> u64 {
    100
}

fn default_batch_size() -> u64 {
    500
}

fn default_max_batch_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    90.0
}

fn default_pause_secs() -> u64 {
    60
}

fn default_result_file() -> String {
    "batch_result.json".to_string()
}

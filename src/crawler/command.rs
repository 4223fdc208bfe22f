//! Crawl unit that launches an external program per batch
//!
//! The program receives the batch through placeholder substitution in its
//! arguments and reports its counts by writing a JSON result file into the
//! batch directory:
//!
//! ```json
//! { "total_products": 4870, "matched_products": 3112 }
//! ```
//!
//! Supported placeholders: `{batch_number}`, `{start_offset}`,
//! `{end_offset}`, `{page_count}`, `{batch_size}`, `{batch_dir}`.

use crate::batch::{BatchDescriptor, BatchResult};
use crate::config::ExecutorConfig;
use crate::crawler::executor::{CrawlExecutor, ExecutorError};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const BATCH_LOG_FILE: &str = "batch.log";

/// Runs each batch as a child process
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    result_file: String,
    batch_size: u64,
}

impl CommandExecutor {
    /// Creates an executor from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Program, argument templates and result file name
    /// * `batch_size` - Products per output file, substituted for `{batch_size}`
    pub fn new(config: &ExecutorConfig, batch_size: u64) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            result_file: config.result_file.clone(),
            batch_size,
        }
    }

    /// Substitutes batch values into the argument templates
    pub fn render_args(&self, batch: &BatchDescriptor, batch_dir: &Path) -> Vec<String> {
        let batch_dir = batch_dir.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{batch_number}", &batch.batch_number.to_string())
                    .replace("{start_offset}", &batch.start_offset.to_string())
                    .replace("{end_offset}", &batch.end_offset.to_string())
                    .replace("{page_count}", &batch.page_count().to_string())
                    .replace("{batch_size}", &self.batch_size.to_string())
                    .replace("{batch_dir}", &batch_dir)
            })
            .collect()
    }

    fn read_result(&self, batch_dir: &Path) -> Result<BatchResult, ExecutorError> {
        let path = batch_dir.join(&self.result_file);
        let bytes = std::fs::read(&path).map_err(|e| {
            ExecutorError::Fatal(format!("could not read {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ExecutorError::Fatal(format!("malformed result file {}: {}", path.display(), e))
        })
    }
}

impl CrawlExecutor for CommandExecutor {
    async fn execute(
        &self,
        batch: &BatchDescriptor,
        batch_dir: &Path,
        cancel: CancellationToken,
    ) -> Result<BatchResult, ExecutorError> {
        let setup_error =
            |e: std::io::Error| ExecutorError::Fatal(format!("batch directory setup: {}", e));

        tokio::fs::create_dir_all(batch_dir)
            .await
            .map_err(setup_error)?;

        // A result left behind by an earlier attempt must not be mistaken for this one
        match tokio::fs::remove_file(batch_dir.join(&self.result_file)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(setup_error(e)),
        }

        let log = std::fs::File::create(batch_dir.join(BATCH_LOG_FILE)).map_err(setup_error)?;
        let log_err = log.try_clone().map_err(setup_error)?;

        let args = self.render_args(batch, batch_dir);
        tracing::debug!("Launching {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExecutorError::Fatal(format!("failed to launch {}: {}", self.program, e))
            })?;

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(status) => status.map_err(|e| {
                ExecutorError::Transient(format!("waiting for crawl process: {}", e))
            })?,
            None => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Could not kill crawl process: {}", e);
                }
                return Err(ExecutorError::Cancelled);
            }
        };

        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("crawl process exited with code {}", code),
                None => "crawl process terminated by signal".to_string(),
            };
            return Err(ExecutorError::Transient(reason));
        }

        self.read_result(batch_dir)
    }
}

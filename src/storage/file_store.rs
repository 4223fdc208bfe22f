//! JSON file storage implementation
//!
//! This module provides a directory-of-JSON-files implementation of the
//! CheckpointStore trait. Records are written to a temporary file in the
//! target directory, synced, then renamed over the destination.

use crate::batch::BatchSummary;
use crate::output::{FinalSummary, GlobalStats};
use crate::state::{BatchCheckpoint, GlobalCheckpoint};
use crate::storage::traits::{CheckpointStore, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const GLOBAL_CHECKPOINT_FILE: &str = "global_checkpoint.json";
const GLOBAL_STATS_FILE: &str = "global_stats.json";
const FINAL_SUMMARY_FILE: &str = "final_summary.json";
const BATCH_CHECKPOINT_FILE: &str = "batch_checkpoint.json";
const BATCH_SUMMARY_FILE: &str = "crawl_summary.json";
const BATCH_DIR_PREFIX: &str = "batch_";

/// File-backed checkpoint store rooted at the run's output directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store, creating the output directory if needed
    ///
    /// # Arguments
    ///
    /// * `root` - The run's output directory
    pub fn open(root: &Path) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn global_path(&self) -> PathBuf {
        self.root.join(GLOBAL_CHECKPOINT_FILE)
    }

    fn batch_checkpoint_path(&self, batch_number: u64) -> PathBuf {
        self.batch_dir(batch_number).join(BATCH_CHECKPOINT_FILE)
    }

    fn summary_path(&self, batch_number: u64) -> PathBuf {
        self.batch_dir(batch_number).join(BATCH_SUMMARY_FILE)
    }

    fn batch_dirs(&self) -> StoreResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            let is_batch_dir = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(BATCH_DIR_PREFIX));
            if is_batch_dir && entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }
}

impl CheckpointStore for FileStore {
    fn load_global(&self) -> StoreResult<Option<GlobalCheckpoint>> {
        read_json(&self.global_path())
    }

    fn save_global(&mut self, checkpoint: &GlobalCheckpoint) -> StoreResult<()> {
        write_json_atomic(&self.global_path(), checkpoint)
    }

    fn batch_dir(&self, batch_number: u64) -> PathBuf {
        self.root.join(format!("{}{:05}", BATCH_DIR_PREFIX, batch_number))
    }

    fn load_batch(&self, batch_number: u64) -> StoreResult<Option<BatchCheckpoint>> {
        let path = self.batch_checkpoint_path(batch_number);
        let checkpoint: Option<BatchCheckpoint> = read_json(&path)?;

        match checkpoint {
            Some(c) if c.batch_number != batch_number => Err(StoreError::Corrupt {
                path,
                message: format!(
                    "expected batch {}, found batch {}",
                    batch_number, c.batch_number
                ),
            }),
            other => Ok(other),
        }
    }

    fn save_batch(&mut self, checkpoint: &BatchCheckpoint) -> StoreResult<()> {
        write_json_atomic(&self.batch_checkpoint_path(checkpoint.batch_number), checkpoint)
    }

    fn load_summary(&self, batch_number: u64) -> StoreResult<Option<BatchSummary>> {
        read_json(&self.summary_path(batch_number))
    }

    fn save_summary(&mut self, summary: &BatchSummary) -> StoreResult<()> {
        let path = self.summary_path(summary.batch_number);
        if path.exists() {
            return Err(StoreError::DuplicateSummary {
                batch_number: summary.batch_number,
            });
        }

        let tmp = write_temp(&path, summary)?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                sync_parent(&path);
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::DuplicateSummary {
                    batch_number: summary.batch_number,
                })
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn load_summaries(&self) -> StoreResult<Vec<BatchSummary>> {
        let mut summaries = Vec::new();
        for dir in self.batch_dirs()? {
            if let Some(summary) = read_json::<BatchSummary>(&dir.join(BATCH_SUMMARY_FILE))? {
                summaries.push(summary);
            }
        }
        summaries.sort_by_key(|s| s.batch_number);
        Ok(summaries)
    }

    fn save_stats(&mut self, stats: &GlobalStats) -> StoreResult<()> {
        write_json_atomic(&self.root.join(GLOBAL_STATS_FILE), stats)
    }

    fn save_final_summary(&mut self, summary: &FinalSummary) -> StoreResult<()> {
        write_json_atomic(&self.root.join(FINAL_SUMMARY_FILE), summary)
    }

    fn reset(&mut self) -> StoreResult<()> {
        for dir in self.batch_dirs()? {
            tracing::debug!("Removing {}", dir.display());
            fs::remove_dir_all(&dir)?;
        }
        for file in [GLOBAL_CHECKPOINT_FILE, GLOBAL_STATS_FILE, FINAL_SUMMARY_FILE] {
            match fs::remove_file(self.root.join(file)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Reads a JSON record, treating a missing file as `None`
fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Serializes `value` into a synced temporary file next to `path`
fn write_temp<T: Serialize>(path: &Path, value: &T) -> StoreResult<NamedTempFile> {
    let dir = path.parent().ok_or_else(|| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: "record path has no parent directory".to_string(),
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Replaces `path` with the serialized `value` in one rename
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let tmp = write_temp(path, value)?;
    tmp.persist(path).map_err(|e| e.error)?;
    sync_parent(path);
    Ok(())
}

/// Flushes the directory entry of a freshly renamed file
#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
            tracing::debug!("Could not sync directory {}: {}", dir.display(), e);
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

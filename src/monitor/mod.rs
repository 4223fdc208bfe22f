//! Host resource monitoring
//!
//! The orchestrator samples memory and disk utilization before every batch
//! and pauses while either is above its configured threshold. Each metric is
//! read on its own; a failed read never stops the run and only skips that
//! metric's comparison.

mod system;

pub use system::SystemProbe;

use crate::config::ResourceConfig;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Errors from sampling host resources
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("No disk found for path {0}")]
    DiskNotFound(String),

    #[error("Host reported zero total {0}")]
    ZeroCapacity(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Point-in-time host utilization; never persisted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSnapshot {
    /// Memory in use, 0 to 100
    pub memory_percent: f64,

    /// Disk in use on the output directory's filesystem, 0 to 100
    pub disk_percent: f64,

    pub sampled_at: DateTime<Utc>,
}

/// Source of host utilization readings
pub trait ResourceProbe {
    /// Memory in use, 0 to 100
    fn memory_percent(&mut self) -> Result<f64, MonitorError>;

    /// Disk in use on the monitored filesystem, 0 to 100
    fn disk_percent(&mut self) -> Result<f64, MonitorError>;

    /// Reads both metrics; fails if either read fails
    fn sample(&mut self) -> Result<ResourceSnapshot, MonitorError> {
        Ok(ResourceSnapshot {
            memory_percent: self.memory_percent()?,
            disk_percent: self.disk_percent()?,
            sampled_at: Utc::now(),
        })
    }
}

/// Which threshold a snapshot crossed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pressure {
    Memory { percent: f64, limit: f64 },
    Disk { percent: f64, limit: f64 },
}

impl fmt::Display for Pressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory { percent, limit } => {
                write!(f, "Memory usage too high: {:.1}% > {}%", percent, limit)
            }
            Self::Disk { percent, limit } => {
                write!(f, "Disk usage too high: {:.1}% > {}%", percent, limit)
            }
        }
    }
}

/// Returns true if either utilization is strictly above its threshold
///
/// Always false when monitoring is disabled.
pub fn is_under_pressure(snapshot: &ResourceSnapshot, config: &ResourceConfig) -> bool {
    pressure(snapshot, config).is_some()
}

/// Returns the first threshold the snapshot crosses, memory first
pub fn pressure(snapshot: &ResourceSnapshot, config: &ResourceConfig) -> Option<Pressure> {
    if !config.enabled {
        return None;
    }
    memory_pressure(snapshot.memory_percent, config)
        .or_else(|| disk_pressure(snapshot.disk_percent, config))
}

fn memory_pressure(percent: f64, config: &ResourceConfig) -> Option<Pressure> {
    (percent > config.max_memory_percent).then_some(Pressure::Memory {
        percent,
        limit: config.max_memory_percent,
    })
}

fn disk_pressure(percent: f64, config: &ResourceConfig) -> Option<Pressure> {
    (percent > config.max_disk_percent).then_some(Pressure::Disk {
        percent,
        limit: config.max_disk_percent,
    })
}

/// Samples a probe and judges pressure against configured thresholds
pub struct ResourceMonitor {
    probe: Box<dyn ResourceProbe + Send>,
    config: ResourceConfig,
}

impl ResourceMonitor {
    pub fn new(probe: Box<dyn ResourceProbe + Send>, config: ResourceConfig) -> Self {
        Self { probe, config }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Takes a fresh snapshot from the probe
    pub fn sample(&mut self) -> Result<ResourceSnapshot, MonitorError> {
        self.probe.sample()
    }

    /// Reads each metric and returns the first pressure found, memory first
    ///
    /// Disabled monitoring skips sampling entirely. A failed read is reported
    /// as a warning and skips only that metric.
    pub fn check(&mut self) -> Option<Pressure> {
        if !self.config.enabled {
            return None;
        }

        match self.probe.memory_percent() {
            Ok(percent) => {
                tracing::debug!("Resources: memory {:.1}%", percent);
                if let Some(pressure) = memory_pressure(percent, &self.config) {
                    return Some(pressure);
                }
            }
            Err(e) => tracing::warn!("Memory sampling failed, skipping memory check: {}", e),
        }

        match self.probe.disk_percent() {
            Ok(percent) => {
                tracing::debug!("Resources: disk {:.1}%", percent);
                disk_pressure(percent, &self.config)
            }
            Err(e) => {
                tracing::warn!("Disk sampling failed, skipping disk check: {}", e);
                None
            }
        }
    }
}

impl fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

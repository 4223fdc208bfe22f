//! Resource probe backed by the host operating system

use crate::monitor::{MonitorError, ResourceProbe};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};

/// Samples memory for the whole host and disk for the filesystem holding
/// `disk_path`
pub struct SystemProbe {
    system: System,
    disk_path: PathBuf,
}

impl SystemProbe {
    pub fn new(disk_path: &Path) -> Self {
        Self {
            system: System::new(),
            disk_path: disk_path.to_path_buf(),
        }
    }
}

impl ResourceProbe for SystemProbe {
    fn memory_percent(&mut self) -> Result<f64, MonitorError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(MonitorError::ZeroCapacity("memory"));
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn disk_percent(&mut self) -> Result<f64, MonitorError> {
        let path = self.disk_path.canonicalize()?;
        let disks = Disks::new_with_refreshed_list();

        // The filesystem holding `path` is the one with the deepest mount point
        let disk = disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .ok_or_else(|| MonitorError::DiskNotFound(path.display().to_string()))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(MonitorError::ZeroCapacity("disk space"));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }
}

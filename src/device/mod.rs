//! Removable device tracking
//!
//! ## Architecture
//!
//! ```text
//! DeviceManager (poll loop, owns Volume → VolumeWatcher)
//!      │ reconcile() every poll interval
//!      ├─ volume appeared  → VolumeWatcher::start()
//!      └─ volume vanished  → VolumeWatcher::stop()
//!
//! VolumeWatcher (one per volume)
//!      notify callback ──FileEvent──▶ bounded mpsc ──▶ dispatch task ──▶ FilePipeline
//! ```
//!
//! Polling is only used for attach/detach. File activity inside a volume is
//! push-based through the OS notification API.

mod manager;
mod watcher;

pub use manager::{DeviceManager, ReconcileSummary};
pub use watcher::{VolumeWatcher, WatchOptions, WatcherState};

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// A mounted removable filesystem, identified by its mount point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Volume(PathBuf);

impl Volume {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self(mount_point.into())
    }

    pub fn mount_point(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Source of the currently mounted removable volumes.
///
/// An empty list is a valid answer; `Err` means the platform query failed.
#[async_trait]
pub trait VolumeEnumerator: Send + Sync {
    async fn removable_volumes(&self) -> Result<Vec<Volume>>;
}

/// Enumerates removable disks through `sysinfo`.
#[derive(Debug, Clone, Default)]
pub struct SysinfoEnumerator;

impl SysinfoEnumerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VolumeEnumerator for SysinfoEnumerator {
    async fn removable_volumes(&self) -> Result<Vec<Volume>> {
        tokio::task::spawn_blocking(|| {
            let disks = sysinfo::Disks::new_with_refreshed_list();
            let mut volumes: Vec<Volume> = disks
                .list()
                .iter()
                .filter(|disk| disk.is_removable())
                .map(|disk| Volume::new(disk.mount_point()))
                .collect();
            volumes.sort();
            volumes.dedup();
            volumes
        })
        .await
        .map_err(|e| Error::Device(format!("Volume enumeration task failed: {}", e)))
    }
}

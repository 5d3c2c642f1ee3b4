//! Removable volume lifecycle: attach and detach watchers as media come and go

use super::watcher::{VolumeWatcher, WatchOptions};
use super::{SysinfoEnumerator, Volume, VolumeEnumerator};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::pipeline::FilePipeline;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: Vec<Volume>,
    pub removed: Vec<Volume>,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty()
    }
}

/// Keeps exactly one running [`VolumeWatcher`] per mounted removable volume.
pub struct DeviceManager {
    enumerator: Arc<dyn VolumeEnumerator>,
    pipeline: Arc<FilePipeline>,
    poll_interval: Duration,
    options: WatchOptions,
    watchers: HashMap<Volume, VolumeWatcher>,
}

impl DeviceManager {
    pub fn new(
        enumerator: Arc<dyn VolumeEnumerator>,
        pipeline: Arc<FilePipeline>,
        poll_interval: Duration,
        options: WatchOptions,
    ) -> Self {
        Self {
            enumerator,
            pipeline,
            poll_interval,
            options,
            watchers: HashMap::new(),
        }
    }

    /// Manager over the host's removable disks.
    pub fn from_config(config: &AgentConfig, pipeline: Arc<FilePipeline>) -> Self {
        Self::new(
            Arc::new(SysinfoEnumerator::new()),
            pipeline,
            config.monitor.poll_interval(),
            WatchOptions::from(&config.monitor),
        )
    }

    /// Volumes currently bound to a watcher, sorted.
    pub fn volumes(&self) -> Vec<Volume> {
        let mut volumes: Vec<Volume> = self.watchers.keys().cloned().collect();
        volumes.sort();
        volumes
    }

    pub fn watcher_id(&self, volume: &Volume) -> Option<Uuid> {
        self.watchers.get(volume).map(|w| w.id())
    }

    /// Bring the watcher set in line with the mounted volumes.
    ///
    /// Removed volumes are stopped while new ones start, so a slow in-flight
    /// file on a pulled drive never delays watching a fresh one. Each removed
    /// watcher is fully stopped before this returns. If enumeration fails
    /// nothing changes and the error is returned. A volume whose watcher fails
    /// to start stays unbound and is retried on the next pass.
    pub async fn reconcile(&mut self) -> Result<ReconcileSummary> {
        let mut current = self.enumerator.removable_volumes().await?;
        current.sort();
        current.dedup();

        let gone: Vec<Volume> = self
            .watchers
            .keys()
            .filter(|v| current.binary_search(v).is_err())
            .cloned()
            .collect();
        let mut stopping: Vec<VolumeWatcher> = gone
            .iter()
            .filter_map(|v| self.watchers.remove(v))
            .collect();

        let mut starting: Vec<VolumeWatcher> = current
            .into_iter()
            .filter(|v| !self.watchers.contains_key(v))
            .map(|v| VolumeWatcher::new(v, self.pipeline.clone(), self.options))
            .collect();

        let stops = join_all(stopping.iter_mut().map(|watcher| async move {
            watcher.stop().await;
            tracing::info!(volume = %watcher.volume(), "USB removed: {}", watcher.volume());
        }));
        let starts = join_all(starting.iter_mut().map(|watcher| async move {
            let result = watcher.start().await;
            match &result {
                Ok(()) => {
                    tracing::info!(volume = %watcher.volume(), "USB inserted: {}", watcher.volume())
                }
                Err(e) => tracing::error!(
                    volume = %watcher.volume(),
                    error = %e,
                    "Failed to start volume watcher"
                ),
            }
            result
        }));
        let (_, results) = tokio::join!(stops, starts);

        let mut summary = ReconcileSummary {
            removed: stopping.iter().map(|w| w.volume().clone()).collect(),
            inserted: Vec::new(),
        };
        for (watcher, result) in starting.into_iter().zip(results) {
            if result.is_ok() {
                let volume = watcher.volume().clone();
                summary.inserted.push(volume.clone());
                self.watchers.insert(volume, watcher);
            }
        }

        summary.removed.sort();
        summary.inserted.sort();
        Ok(summary)
    }

    /// Reconcile every poll interval until `cancel` fires, then stop all watchers.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Device monitor started"
        );

        loop {
            if let Err(e) = self.reconcile().await {
                tracing::warn!(error = %e, "Volume enumeration failed, skipping this pass");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.shutdown().await;
        tracing::info!("Device monitor stopped");
    }

    /// Stop and unbind every watcher.
    pub async fn shutdown(&mut self) {
        let mut watchers: Vec<VolumeWatcher> = self.watchers.drain().map(|(_, w)| w).collect();
        join_all(watchers.iter_mut().map(|w| w.stop())).await;
    }
}

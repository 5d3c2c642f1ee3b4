//! Per-volume filesystem watcher

use super::Volume;
use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::pipeline::{FileEvent, FilePipeline};
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Upper bound on settle rounds for a file that keeps changing.
const MAX_SETTLE_ROUNDS: u32 = 40;

/// Per-watcher tuning, taken from [`MonitorConfig`].
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Bounded queue size between the OS callback and the dispatcher
    pub queue_capacity: usize,
    /// Quiet period a freshly written file must show before processing
    pub settle: Duration,
}

impl From<&MonitorConfig> for WatchOptions {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            queue_capacity: config.event_queue_capacity,
            settle: config.settle(),
        }
    }
}

/// Watcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Constructed, not yet observing
    Created,
    /// Observing and dispatching
    Running,
    /// Stopped; cannot be restarted
    Stopped,
}

/// Observes file creation under one volume and feeds the pipeline.
///
/// The OS notification callback only enqueues [`FileEvent`]s; a dedicated
/// dispatch task drains the queue and runs the pipeline in arrival order.
pub struct VolumeWatcher {
    id: Uuid,
    volume: Volume,
    pipeline: Arc<FilePipeline>,
    options: WatchOptions,
    state: WatcherState,
    accepting: Arc<AtomicBool>,
    cancel: CancellationToken,
    os_watcher: Option<RecommendedWatcher>,
    dispatcher: Option<JoinHandle<()>>,
}

impl VolumeWatcher {
    pub fn new(volume: Volume, pipeline: Arc<FilePipeline>, options: WatchOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            volume,
            pipeline,
            options,
            state: WatcherState::Created,
            accepting: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            os_watcher: None,
            dispatcher: None,
        }
    }

    /// Unique per instance; a restarted volume gets a new id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Begin observing the volume. Valid once per instance.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != WatcherState::Created {
            return Err(Error::Watcher(format!(
                "Watcher for {} cannot be started from state {:?}",
                self.volume, self.state
            )));
        }

        let (tx, rx) = mpsc::channel(self.options.queue_capacity.max(1));
        let accepting = self.accepting.clone();
        let root = self.volume.mount_point().to_path_buf();
        let volume = self.volume.clone();

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !accepting.load(Ordering::Acquire) {
                    return;
                }
                for path in created_files(&event) {
                    let file_event = FileEvent::new(path, volume.clone());
                    if tx.blocking_send(file_event).is_err() {
                        // Dispatcher is gone; the watcher is being stopped
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(volume = %volume, error = %e, "Watch error");
            }
        };

        self.accepting.store(true, Ordering::Release);
        let setup = tokio::task::spawn_blocking(move || -> Result<RecommendedWatcher> {
            let mut watcher = notify::recommended_watcher(handler)?;
            watcher.watch(&root, RecursiveMode::Recursive)?;
            Ok(watcher)
        })
        .await
        .map_err(|e| Error::Internal(format!("Watch setup task failed: {}", e)))
        .and_then(|res| res);

        let os_watcher = match setup {
            Ok(w) => w,
            Err(e) => {
                self.accepting.store(false, Ordering::Release);
                self.state = WatcherState::Stopped;
                return Err(Error::Watcher(format!(
                    "Failed to watch {}: {}",
                    self.volume, e
                )));
            }
        };

        self.dispatcher = Some(tokio::spawn(
            dispatch(
                self.volume.clone(),
                rx,
                self.pipeline.clone(),
                self.options.settle,
                self.cancel.clone(),
            )
            .in_current_span(),
        ));
        self.os_watcher = Some(os_watcher);
        self.state = WatcherState::Running;

        tracing::debug!(volume = %self.volume, watcher_id = %self.id, "Volume watcher started");
        Ok(())
    }

    /// Stop observing and wait for the dispatch task to finish.
    ///
    /// An event already inside the pipeline completes; queued events that
    /// never started are discarded and counted in the log. Once this returns
    /// no further events are processed for the volume.
    pub async fn stop(&mut self) {
        if self.state != WatcherState::Running {
            self.state = WatcherState::Stopped;
            return;
        }
        self.state = WatcherState::Stopped;

        self.accepting.store(false, Ordering::Release);
        self.cancel.cancel();

        if let Some(handle) = self.dispatcher.take() {
            if let Err(e) = handle.await {
                tracing::error!(volume = %self.volume, error = %e, "Dispatcher task panicked");
            }
        }

        // Dropping the watcher releases the OS watch handles. Some backends
        // join their event thread on drop, so keep it off the runtime threads.
        if let Some(watcher) = self.os_watcher.take() {
            let _ = tokio::task::spawn_blocking(move || drop(watcher)).await;
        }

        tracing::debug!(volume = %self.volume, watcher_id = %self.id, "Volume watcher stopped");
    }
}

impl Drop for VolumeWatcher {
    fn drop(&mut self) {
        self.accepting.store(false, Ordering::Release);
        self.cancel.cancel();
    }
}

/// Paths of regular files created by `event`.
fn created_files(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::File) => event.paths.clone(),
        // Backends that cannot tell files from folders report `Any`
        EventKind::Create(CreateKind::Any) | EventKind::Create(CreateKind::Other) => event
            .paths
            .iter()
            .filter(|p| p.is_file())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

async fn dispatch(
    volume: Volume,
    mut rx: mpsc::Receiver<FileEvent>,
    pipeline: Arc<FilePipeline>,
    settle: Duration,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        wait_until_settled(&event.path, settle).await;
        let report = pipeline.process(&event).await;
        tracing::debug!(
            volume = %volume,
            path = %report.path.display(),
            category = %report.category,
            disposition = %report.disposition,
            ok = report.succeeded(),
            "File event handled"
        );
    }

    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        tracing::warn!(
            volume = %volume,
            discarded,
            "Discarded queued file events for stopped volume"
        );
    }
}

/// Wait until `path` stops changing, so a file still being copied onto the
/// volume is not classified half-written.
async fn wait_until_settled(path: &Path, window: Duration) {
    if window.is_zero() {
        return;
    }

    let mut last = None;
    for _ in 0..MAX_SETTLE_ROUNDS {
        // A vanished file is reported by the pipeline itself
        let Ok(meta) = tokio::fs::metadata(path).await else {
            return;
        };
        let modified = meta.modified().ok();
        let quiet = modified
            .and_then(|m| m.elapsed().ok())
            .map(|age| age >= window)
            .unwrap_or(false);
        let fingerprint = (meta.len(), modified);
        if quiet || last == Some(fingerprint) {
            return;
        }
        last = Some(fingerprint);
        tokio::time::sleep(window).await;
    }

    tracing::debug!(path = %path.display(), "File still changing, processing anyway");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalClient, ApprovalDecision, FileInfo};
    use crate::classifier::KeywordClassifier;
    use crate::config::{ClassifierConfig, OcrConfig, SourcePolicy, ZonesConfig};
    use crate::extract::{DocumentExtractor, OcrExtractor, TextExtractor};
    use crate::pipeline::FileDisposer;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    const OPTIONS: WatchOptions = WatchOptions {
        queue_capacity: 16,
        settle: Duration::from_millis(50),
    };

    struct DenyAll;

    #[async_trait]
    impl ApprovalClient for DenyAll {
        async fn request_approval(&self, _info: &FileInfo) -> ApprovalDecision {
            ApprovalDecision::Denied
        }
    }

    /// Image extractor that blocks for `delay` and counts its calls.
    struct SlowOcr {
        delay: Duration,
        calls: AtomicUsize,
        finished: AtomicBool,
    }

    #[async_trait]
    impl TextExtractor for SlowOcr {
        async fn extract(&self, _path: &Path) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(None)
        }

        fn name(&self) -> &str {
            "slow-ocr"
        }
    }

    fn make_pipeline(dir: &Path) -> Arc<FilePipeline> {
        make_pipeline_with(
            dir,
            Arc::new(OcrExtractor::new(&OcrConfig {
                enabled: false,
                ..OcrConfig::default()
            })),
        )
    }

    fn make_pipeline_with(dir: &Path, images: Arc<dyn TextExtractor>) -> Arc<FilePipeline> {
        Arc::new(FilePipeline::new(
            Arc::new(DocumentExtractor::new()),
            images,
            Arc::new(KeywordClassifier::from_config(&ClassifierConfig::default()).unwrap()),
            Arc::new(DenyAll),
            FileDisposer::new(&ZonesConfig {
                safe_dir: dir.join("safe"),
                alert_dir: dir.join("alert"),
                source_policy: SourcePolicy::Retain,
            }),
        ))
    }

    async fn wait_for(path: &Path) -> bool {
        for _ in 0..100 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    fn setup() -> (TempDir, VolumeWatcher) {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().join("usb");
        std::fs::create_dir_all(&mount).unwrap();
        let watcher = VolumeWatcher::new(Volume::new(&mount), make_pipeline(dir.path()), OPTIONS);
        (dir, watcher)
    }

    #[tokio::test]
    async fn test_created_file_reaches_pipeline() {
        let (dir, mut watcher) = setup();
        watcher.start().await.unwrap();
        assert_eq!(watcher.state(), WatcherState::Running);

        std::fs::write(dir.path().join("usb/report.pdf"), "quarterly").unwrap();
        assert!(wait_for(&dir.path().join("safe/report.pdf")).await);

        watcher.stop().await;
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_sensitive_file_is_removed_from_volume() {
        let (dir, mut watcher) = setup();
        watcher.start().await.unwrap();

        let path = dir.path().join("usb/orders.txt");
        std::fs::write(&path, "Turkish Armed Forces deployment").unwrap();

        let mut removed = false;
        for _ in 0..100 {
            if !path.exists() {
                removed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(removed);
        assert!(!dir.path().join("safe/orders.txt").exists());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_directories_are_not_events() {
        let (dir, mut watcher) = setup();
        watcher.start().await.unwrap();

        std::fs::create_dir(dir.path().join("usb/photos")).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        std::fs::write(dir.path().join("usb/photos/list.csv"), "a,b").unwrap();

        assert!(wait_for(&dir.path().join("safe/list.csv")).await);
        assert!(!dir.path().join("safe/photos").exists());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_no_events_after_stop() {
        let (dir, mut watcher) = setup();
        watcher.start().await.unwrap();
        watcher.stop().await;

        std::fs::write(dir.path().join("usb/late.pdf"), "late").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!dir.path().join("safe/late.pdf").exists());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stop_finishes_in_flight_and_discards_queued() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().join("usb");
        std::fs::create_dir_all(&mount).unwrap();
        let ocr = Arc::new(SlowOcr {
            delay: Duration::from_secs(1),
            calls: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        });
        let mut watcher = VolumeWatcher::new(
            Volume::new(&mount),
            make_pipeline_with(dir.path(), ocr.clone()),
            OPTIONS,
        );
        watcher.start().await.unwrap();

        std::fs::write(mount.join("first.png"), "pixels").unwrap();
        for _ in 0..100 {
            if ocr.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);

        // Queued behind the busy dispatcher
        std::fs::write(mount.join("second.png"), "pixels").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!ocr.finished.load(Ordering::SeqCst));

        watcher.stop().await;
        assert!(ocr.finished.load(Ordering::SeqCst));
        assert!(dir.path().join("safe/first.png").exists());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("safe/second.png").exists());
        assert!(logs_contain("Discarded queued file events"));
    }

    #[tokio::test]
    async fn test_start_only_once() {
        let (_dir, mut watcher) = setup();
        watcher.start().await.unwrap();
        assert!(matches!(watcher.start().await, Err(Error::Watcher(_))));

        watcher.stop().await;
        assert!(matches!(watcher.start().await, Err(Error::Watcher(_))));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (_dir, mut watcher) = setup();
        watcher.stop().await;
        assert_eq!(watcher.state(), WatcherState::Stopped);
        watcher.stop().await;
        assert!(watcher.start().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_mount_point_fails_to_start() {
        let dir = TempDir::new().unwrap();
        let mut watcher = VolumeWatcher::new(
            Volume::new(dir.path().join("not-mounted")),
            make_pipeline(dir.path()),
            OPTIONS,
        );
        assert!(matches!(watcher.start().await, Err(Error::Watcher(_))));
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_settle_returns_for_old_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let started = std::time::Instant::now();
        wait_until_settled(&dir.path().join("missing"), Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));

        let path = dir.path().join("fresh.bin");
        std::fs::write(&path, "data").unwrap();
        let started = std::time::Instant::now();
        wait_until_settled(&path, Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_created_files_filter() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        let event = Event::new(EventKind::Create(CreateKind::File)).add_path(file.clone());
        assert_eq!(created_files(&event), vec![file.clone()]);

        let folder = Event::new(EventKind::Create(CreateKind::Folder)).add_path(dir.path().into());
        assert!(created_files(&folder).is_empty());

        let any_dir = Event::new(EventKind::Create(CreateKind::Any)).add_path(dir.path().into());
        assert!(created_files(&any_dir).is_empty());

        let any_file = Event::new(EventKind::Create(CreateKind::Any)).add_path(file.clone());
        assert_eq!(created_files(&any_file), vec![file.clone()]);

        let modify = Event::new(EventKind::Modify(notify::event::ModifyKind::Any)).add_path(file);
        assert!(created_files(&modify).is_empty());
    }
}

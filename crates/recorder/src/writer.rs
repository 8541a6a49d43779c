//! AsyncEpisodeWriter - persists a finished episode off the frame loop
//!
//! `submit` moves the [`EpisodeBuffer`] into a spawned tokio task and returns
//! a [`WriteHandle`] immediately. The task calls the store in a fixed order
//! (`prepare`, `write_frame` per frame, `finish`), publishes progress through
//! [`WriteProgress`] and invokes the completion callback exactly once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use contracts::EpisodeStore;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::{DiskEpisodeStore, EpisodeBuffer, RecorderError, WriteProgress};

/// A frame the writer could not persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFailure {
    pub frame_index: u64,
    pub error: String,
}

/// Outcome of one episode write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub episode_path: PathBuf,
    pub total_frames: usize,
    pub frames_written: usize,
    pub failed_frames: Vec<FrameFailure>,
    /// Set when the episode was abandoned as a whole
    pub fatal: Option<String>,
    pub elapsed_ms: f64,
}

impl WriteReport {
    fn new(episode_path: PathBuf, total_frames: usize) -> Self {
        Self {
            episode_path,
            total_frames,
            frames_written: 0,
            failed_frames: Vec::new(),
            fatal: None,
            elapsed_ms: 0.0,
        }
    }

    /// Every frame persisted and the episode closed cleanly
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none() && self.frames_written == self.total_frames
    }
}

/// Handle to a running episode write
///
/// Dropping it does not cancel the write.
#[derive(Debug)]
pub struct WriteHandle {
    episode_path: PathBuf,
    progress: Arc<WriteProgress>,
    task: JoinHandle<WriteReport>,
}

impl WriteHandle {
    pub fn episode_path(&self) -> &Path {
        &self.episode_path
    }

    /// Fraction of frames processed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.progress.fraction()
    }

    /// Shared progress counters
    pub fn progress_handle(&self) -> &Arc<WriteProgress> {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the write to end
    ///
    /// # Errors
    /// [`RecorderError::WorkerPanicked`] if the task could not be joined.
    pub async fn join(self) -> Result<WriteReport, RecorderError> {
        self.task
            .await
            .map_err(|e| RecorderError::WorkerPanicked(e.to_string()))
    }
}

/// Writes episodes on a tokio runtime
///
/// Each submission gets a fresh clone of the configured store.
///
/// The buffer is moved into the writer; it cannot be touched afterwards:
///
/// ```compile_fail
/// use recorder::{AsyncEpisodeWriter, EpisodeBuffer};
///
/// # async fn demo() {
/// let writer = AsyncEpisodeWriter::new("png").unwrap();
/// let buffer = EpisodeBuffer::new("/tmp/episode");
/// let _handle = writer.submit(buffer, |_| {});
/// let _ = buffer.len();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AsyncEpisodeWriter<S = DiskEpisodeStore> {
    store: S,
    runtime: Handle,
}

impl AsyncEpisodeWriter<DiskEpisodeStore> {
    /// Disk writer on the current tokio runtime
    ///
    /// # Errors
    /// [`RecorderError::NoRuntime`] when called outside a runtime.
    pub fn new(image_extension: impl Into<String>) -> Result<Self, RecorderError> {
        Self::with_store(DiskEpisodeStore::new(image_extension))
    }
}

impl<S> AsyncEpisodeWriter<S>
where
    S: EpisodeStore + Clone + Send + 'static,
{
    /// Writer for a custom store on the current tokio runtime
    pub fn with_store(store: S) -> Result<Self, RecorderError> {
        let runtime = Handle::try_current().map_err(|e| RecorderError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(store, runtime))
    }

    pub fn with_handle(store: S, runtime: Handle) -> Self {
        Self { store, runtime }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `buffer` with the configured store
    pub fn submit<F>(&self, buffer: EpisodeBuffer, on_complete: F) -> WriteHandle
    where
        F: FnOnce(&WriteReport) + Send + 'static,
    {
        self.submit_to(self.store.clone(), buffer, on_complete)
    }

    /// Persist `buffer` with an explicit store
    pub fn submit_to<T, F>(&self, store: T, buffer: EpisodeBuffer, on_complete: F) -> WriteHandle
    where
        T: EpisodeStore + Send + 'static,
        F: FnOnce(&WriteReport) + Send + 'static,
    {
        let episode_path = buffer.episode_path().to_path_buf();
        let progress = Arc::new(WriteProgress::new(buffer.len()));
        let worker_progress = Arc::clone(&progress);
        let total = buffer.len();

        debug!(
            episode = %episode_path.display(),
            frames = total,
            store = store.name(),
            "Submitting episode"
        );

        let inner = self
            .runtime
            .spawn(episode_worker(store, buffer, Arc::clone(&worker_progress)));
        let report_path = episode_path.clone();
        let task = self.runtime.spawn(async move {
            let report = match inner.await {
                Ok(report) => report,
                Err(e) => {
                    error!(episode = %report_path.display(), error = %e, "Episode writer task failed");
                    worker_progress.abandon_rest();
                    let mut report = WriteReport::new(report_path, total);
                    report.frames_written = worker_progress.written();
                    report.fatal = Some(format!("writer task failed: {e}"));
                    report
                }
            };
            worker_progress.mark_done();
            on_complete(&report);
            report
        });

        WriteHandle {
            episode_path,
            progress,
            task,
        }
    }
}

/// Worker task that writes every frame of one episode
#[instrument(
    name = "episode_writer",
    skip(store, buffer, progress),
    fields(store = store.name(), episode = %buffer.episode_path().display())
)]
async fn episode_worker<S: EpisodeStore>(
    mut store: S,
    buffer: EpisodeBuffer,
    progress: Arc<WriteProgress>,
) -> WriteReport {
    let started = Instant::now();
    let mut report = WriteReport::new(buffer.episode_path().to_path_buf(), buffer.len());

    if let Err(e) = store.prepare(buffer.episode_path(), &buffer.camera_names()).await {
        error!(error = %e, "Episode prepare failed, abandoning episode");
        progress.abandon_rest();
        report.fatal = Some(e.to_string());
        return finish_report(report, started);
    }

    for frame in buffer.frames() {
        match store.write_frame(frame).await {
            Ok(()) => {
                report.frames_written += 1;
                progress.inc_written();
            }
            Err(e) => {
                error!(
                    frame_index = frame.frame_index,
                    error = %e,
                    "Frame write failed"
                );
                observability::record_frame_write_failure(store.name());
                report.failed_frames.push(FrameFailure {
                    frame_index: frame.frame_index,
                    error: e.to_string(),
                });
                progress.inc_failed();
                // Continue with the next frame
            }
        }
        observability::record_write_progress(progress.fraction());
    }

    if let Err(e) = store.finish().await {
        error!(error = %e, "Episode finish failed");
        report.fatal = Some(e.to_string());
    }

    finish_report(report, started)
}

fn finish_report(mut report: WriteReport, started: Instant) -> WriteReport {
    report.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    observability::record_write_progress(1.0);
    observability::record_episode_written(
        report.frames_written,
        report.total_frames - report.frames_written,
        report.elapsed_ms,
    );

    if report.is_complete() {
        info!(
            episode = %report.episode_path.display(),
            frames = report.frames_written,
            elapsed_ms = report.elapsed_ms,
            "Episode written"
        );
    } else {
        warn!(
            episode = %report.episode_path.display(),
            written = report.frames_written,
            total = report.total_frames,
            failed = report.failed_frames.len(),
            fatal = ?report.fatal,
            "Episode written partially"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, FrameRecord, Telemetry};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    /// Mock store for testing
    #[derive(Clone, Default)]
    struct MockStore {
        written: Arc<Mutex<Vec<u64>>>,
        fail_frames: Vec<u64>,
        fail_prepare: bool,
        delay_ms: u64,
    }

    impl EpisodeStore for MockStore {
        fn name(&self) -> &str {
            "mock"
        }

        async fn prepare(&mut self, _path: &Path, _cameras: &[String]) -> Result<(), ContractError> {
            if self.fail_prepare {
                return Err(ContractError::store_write("mock", "permission denied"));
            }
            Ok(())
        }

        async fn write_frame(&mut self, frame: &FrameRecord) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail_frames.contains(&frame.frame_index) {
                return Err(ContractError::store_write("mock", "disk full"));
            }
            self.written.lock().unwrap().push(frame.frame_index);
            Ok(())
        }

        async fn finish(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn buffer(frames: u64) -> EpisodeBuffer {
        let mut buffer = EpisodeBuffer::new("/tmp/mock-episode");
        for i in 0..frames {
            buffer.push(FrameRecord {
                frame_index: i,
                images: BTreeMap::new(),
                telemetry: Telemetry::default(),
            });
        }
        buffer
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl FnOnce(&WriteReport) + Send + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cb_calls = Arc::clone(&calls);
        (calls, move |_: &WriteReport| {
            cb_calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_writes_in_buffer_order() {
        let store = MockStore::default();
        let written = Arc::clone(&store.written);
        let writer = AsyncEpisodeWriter::with_store(store).unwrap();
        let (calls, cb) = counting_callback();

        let handle = writer.submit(buffer(5), cb);
        let report = handle.join().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.frames_written, 5);
        assert_eq!(*written.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_frame_is_reported_and_writer_continues() {
        let store = MockStore {
            fail_frames: vec![1, 3],
            ..Default::default()
        };
        let written = Arc::clone(&store.written);
        let writer = AsyncEpisodeWriter::with_store(store).unwrap();
        let (calls, cb) = counting_callback();

        let handle = writer.submit(buffer(5), cb);
        let progress = Arc::clone(handle.progress_handle());
        let report = handle.join().await.unwrap();

        assert!(!report.is_complete());
        assert!(report.fatal.is_none());
        assert_eq!(report.frames_written, 3);
        let failed: Vec<_> = report.failed_frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(failed, vec![1, 3]);
        assert_eq!(*written.lock().unwrap(), vec![0, 2, 4]);
        assert_eq!(progress.fraction(), 1.0);
        assert_eq!(progress.failed(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prepare_failure_abandons_episode() {
        let store = MockStore {
            fail_prepare: true,
            ..Default::default()
        };
        let writer = AsyncEpisodeWriter::with_store(store).unwrap();
        let (calls, cb) = counting_callback();

        let report = writer.submit(buffer(3), cb).join().await.unwrap();

        assert_eq!(report.frames_written, 0);
        assert!(report.fatal.as_deref().unwrap().contains("permission denied"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_episode_completes() {
        let writer = AsyncEpisodeWriter::with_store(MockStore::default()).unwrap();
        let (calls, cb) = counting_callback();

        let handle = writer.submit(buffer(0), cb);
        assert_eq!(handle.progress(), 1.0);
        let report = handle.join().await.unwrap();
        assert!(report.is_complete());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_returns_before_write_finishes() {
        let store = MockStore {
            delay_ms: 20,
            ..Default::default()
        };
        let writer = AsyncEpisodeWriter::with_store(store).unwrap();

        let handle = writer.submit(buffer(5), |_| {});
        assert!(!handle.is_finished());
        assert!(handle.progress() < 1.0);

        let progress = Arc::clone(handle.progress_handle());
        let mut last = 0.0;
        while !progress.is_done() {
            let now = progress.fraction();
            assert!(now >= last);
            last = now;
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(handle.join().await.unwrap().frames_written, 5);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = AsyncEpisodeWriter::new("png").unwrap_err();
        assert!(matches!(err, RecorderError::NoRuntime(_)));
    }
}

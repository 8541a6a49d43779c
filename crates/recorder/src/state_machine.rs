//! RecordingStateMachine - Idle → Recording → Writing → Idle
//!
//! Owns the [`EpisodeBuffer`] while recording and hands it to the
//! [`AsyncEpisodeWriter`] on `stop_and_flush`. Completion arrives through a
//! channel fed by the writer callback and is drained without blocking by
//! [`RecordingStateMachine::poll_completion`]. Each submission carries a
//! sequence number; a report that does not match the in-flight write is
//! dropped.

use std::path::{Path, PathBuf};

use contracts::{EpisodeStore, FrameRecord, RecordingState};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{AsyncEpisodeWriter, DiskEpisodeStore, EpisodeBuffer, RecorderError, WriteHandle, WriteReport};

pub struct RecordingStateMachine<S = DiskEpisodeStore> {
    state: RecordingState,
    output_root: Option<PathBuf>,
    writer: AsyncEpisodeWriter<S>,
    buffer: Option<EpisodeBuffer>,
    in_flight: Option<WriteHandle>,
    /// Sequence number of the last submitted write
    submission: u64,
    completion_tx: mpsc::UnboundedSender<(u64, WriteReport)>,
    completion_rx: mpsc::UnboundedReceiver<(u64, WriteReport)>,
}

impl<S> RecordingStateMachine<S>
where
    S: EpisodeStore + Clone + Send + 'static,
{
    /// `output_root = None` disables recording (`start` fails)
    pub fn new(output_root: Option<PathBuf>, writer: AsyncEpisodeWriter<S>) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            state: RecordingState::Idle,
            output_root,
            writer,
            buffer: None,
            in_flight: None,
            submission: 0,
            completion_tx,
            completion_rx,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn output_root(&self) -> Option<&Path> {
        self.output_root.as_deref()
    }

    /// Path of the episode being recorded or written
    pub fn current_episode(&self) -> Option<&Path> {
        self.buffer
            .as_ref()
            .map(EpisodeBuffer::episode_path)
            .or_else(|| self.in_flight.as_ref().map(WriteHandle::episode_path))
    }

    /// Frames buffered in the current episode
    pub fn buffered_frames(&self) -> usize {
        self.buffer.as_ref().map_or(0, EpisodeBuffer::len)
    }

    /// Begin a new episode at `output_root/episode_name`
    ///
    /// # Errors
    /// - [`RecorderError::InvalidTransition`] unless `Idle`
    /// - [`RecorderError::NoDestination`] without an output root
    pub fn start(&mut self, episode_name: &str) -> Result<PathBuf, RecorderError> {
        self.expect_state("start recording", RecordingState::Idle)?;
        let root = self.output_root.as_ref().ok_or(RecorderError::NoDestination)?;

        let episode_path = root.join(episode_name);
        info!(episode = %episode_path.display(), "Recording started");
        self.buffer = Some(EpisodeBuffer::new(episode_path.clone()));
        self.state = RecordingState::Recording;
        Ok(episode_path)
    }

    /// Append a frame to the current episode
    pub fn tick_record(&mut self, frame: FrameRecord) -> Result<(), RecorderError> {
        self.expect_state("record a frame", RecordingState::Recording)?;
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| RecorderError::invalid_transition("record a frame", self.state))?;
        buffer.push(frame);
        observability::record_frame_captured(buffer.len());
        Ok(())
    }

    /// Hand the buffered episode to the writer and enter `Writing`
    pub fn stop_and_flush(&mut self) -> Result<(), RecorderError> {
        self.expect_state("stop recording", RecordingState::Recording)?;
        let buffer = self
            .buffer
            .take()
            .ok_or_else(|| RecorderError::invalid_transition("stop recording", self.state))?;

        info!(
            episode = %buffer.episode_path().display(),
            frames = buffer.len(),
            "Recording stopped, writing episode"
        );

        self.submission += 1;
        let submission = self.submission;
        let tx = self.completion_tx.clone();
        let handle = self.writer.submit(buffer, move |report| {
            // receiver gone means the state machine was dropped
            let _ = tx.send((submission, report.clone()));
        });
        self.in_flight = Some(handle);
        self.state = RecordingState::Writing;
        Ok(())
    }

    /// Writer finished; drop the flushed episode and return to `Idle`
    ///
    /// Driven only by the writer's completion message.
    fn on_write_complete(&mut self) -> Result<(), RecorderError> {
        self.expect_state("complete a write", RecordingState::Writing)?;
        self.in_flight = None;
        self.state = RecordingState::Idle;
        debug!("Episode write acknowledged");
        Ok(())
    }

    /// Non-blocking check for writer completion
    ///
    /// On completion transitions to `Idle` and returns the report.
    pub fn poll_completion(&mut self) -> Option<WriteReport> {
        loop {
            let (submission, report) = self.completion_rx.try_recv().ok()?;
            if let Some(report) = self.acknowledge(submission, report) {
                return Some(report);
            }
        }
    }

    /// Wait until the in-flight write (if any) completes
    pub async fn wait_for_completion(&mut self) -> Option<WriteReport> {
        if self.state != RecordingState::Writing {
            return None;
        }
        loop {
            let (submission, report) = self.completion_rx.recv().await?;
            if let Some(report) = self.acknowledge(submission, report) {
                return Some(report);
            }
        }
    }

    /// Fraction of the in-flight episode written, while `Writing`
    pub fn write_progress(&self) -> Option<f64> {
        match self.state {
            RecordingState::Writing => self.in_flight.as_ref().map(WriteHandle::progress),
            _ => None,
        }
    }

    fn acknowledge(&mut self, submission: u64, report: WriteReport) -> Option<WriteReport> {
        if submission != self.submission {
            warn!(
                submission,
                current = self.submission,
                episode = %report.episode_path.display(),
                "Dropping stale write completion"
            );
            return None;
        }
        if let Err(e) = self.on_write_complete() {
            warn!(error = %e, "Write completion arrived outside Writing");
            return None;
        }
        Some(report)
    }

    fn expect_state(&self, op: &'static str, expected: RecordingState) -> Result<(), RecorderError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RecorderError::invalid_transition(op, self.state))
        }
    }
}

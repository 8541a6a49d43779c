//! # Recorder
//!
//! Episode recording pipeline.
//!
//! Responsibilities:
//! - Buffer frames while recording (`EpisodeBuffer`)
//! - Govern Idle / Recording / Writing transitions (`RecordingStateMachine`)
//! - Persist finished episodes off the frame loop (`AsyncEpisodeWriter`)
//! - Lay out episodes on disk as `imgs/` + `driving_log.csv` (`DiskEpisodeStore`)
//!
//! # Example
//!
//! ```no_run
//! use recorder::{AsyncEpisodeWriter, RecordingStateMachine};
//!
//! # async fn demo() -> Result<(), recorder::RecorderError> {
//! let writer = AsyncEpisodeWriter::new("png")?;
//! let mut recording = RecordingStateMachine::new(Some("./recordings".into()), writer);
//!
//! recording.start("2024-01-01_12-00-00")?;
//! // recording.tick_record(frame)? once per tick ...
//! recording.stop_and_flush()?;
//!
//! // later, from the frame loop
//! if let Some(report) = recording.poll_completion() {
//!     println!("wrote {} frames", report.frames_written);
//! }
//! # Ok(())
//! # }
//! ```

mod buffer;
mod error;
mod progress;
mod state_machine;
mod store;
mod writer;

pub use buffer::EpisodeBuffer;
pub use error::RecorderError;
pub use progress::{ProgressSnapshot, WriteProgress};
pub use state_machine::RecordingStateMachine;
pub use store::{driving_log_header, DiskEpisodeStore, DRIVING_LOG, IMAGE_DIR, TELEMETRY_COLUMNS};
pub use writer::{AsyncEpisodeWriter, FrameFailure, WriteHandle, WriteReport};

//! Recorder error types

use contracts::RecordingState;
use thiserror::Error;

/// Recorder-specific errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Operation not allowed in the current recording state
    #[error("cannot {op} while {state}")]
    InvalidTransition {
        op: &'static str,
        state: RecordingState,
    },

    /// `start` without a configured output root
    #[error("no output path configured, recording disabled")]
    NoDestination,

    /// Writer constructed outside a tokio runtime
    #[error("episode writer requires a tokio runtime: {0}")]
    NoRuntime(String),

    /// Store error (from contract)
    #[error("store error: {0}")]
    Store(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer task panicked or was aborted
    #[error("episode writer task failed: {0}")]
    WorkerPanicked(String),
}

impl RecorderError {
    pub fn invalid_transition(op: &'static str, state: RecordingState) -> Self {
        Self::InvalidTransition { op, state }
    }
}

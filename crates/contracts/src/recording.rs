//! Recording state and commands shared between the recorder and the frame loop.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::HighLevelCommand;

/// Recording lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    /// Not recording; initial state and the state after every episode
    #[default]
    Idle,
    /// Frames are being buffered
    Recording,
    /// A finished episode is being persisted
    Writing,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "IDLE",
            RecordingState::Recording => "RECORDING",
            RecordingState::Writing => "WRITING",
        };
        f.write_str(name)
    }
}

/// Commands forwarded by the surrounding application (keyboard, joystick, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingCommand {
    StartRecording,
    StopRecording,
    NewEpisode,
    SetHighLevelCommand(HighLevelCommand),
}

//! EpisodeBuffer - ordered frames of one recording session

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use contracts::FrameRecord;

/// Append-only frames of the current episode plus its destination
///
/// Only the state machine appends; once submitted the writer owns it.
#[derive(Debug)]
pub struct EpisodeBuffer {
    episode_path: PathBuf,
    frames: Vec<FrameRecord>,
}

impl EpisodeBuffer {
    /// Empty buffer for `episode_path`
    pub fn new(episode_path: impl Into<PathBuf>) -> Self {
        Self {
            episode_path: episode_path.into(),
            frames: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, frame: FrameRecord) {
        self.frames.push(frame);
    }

    pub fn episode_path(&self) -> &Path {
        &self.episode_path
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sorted union of camera names over all frames
    pub fn camera_names(&self) -> Vec<String> {
        self.frames
            .iter()
            .flat_map(|f| f.images.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }
}

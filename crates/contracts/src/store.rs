//! EpisodeStore trait - episode writer output interface
//!
//! Defines the abstract interface episode persistence backends implement.

use std::path::Path;

use crate::{ContractError, FrameRecord};

/// Episode persistence trait
///
/// Called from the writer task in a fixed order: `prepare` once, then
/// `write_frame` for every frame in buffer order, then `finish`.
#[trait_variant::make(EpisodeStore: Send)]
pub trait LocalEpisodeStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Prepare the episode destination
    ///
    /// `cameras` fixes the image column order of the telemetry table.
    async fn prepare(&mut self, episode_path: &Path, cameras: &[String]) -> Result<(), ContractError>;

    /// Persist one frame (all images, then its telemetry row)
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write_frame(&mut self, frame: &FrameRecord) -> Result<(), ContractError>;

    /// Flush and close the episode
    async fn finish(&mut self) -> Result<(), ContractError>;
}

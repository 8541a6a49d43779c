//! EpisodeClock - frame and episode counters

use chrono::{DateTime, Local};

/// Episode directory name format
pub const EPISODE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Counts total frames, frames within the current episode and episodes
///
/// `episode_num` starts at 0; the first [`EpisodeClock::new_episode`] makes
/// it 1.
#[derive(Debug, Clone)]
pub struct EpisodeClock {
    frame: u64,
    episode_frame: u64,
    episode_num: u64,
    episode_started: DateTime<Local>,
}

impl EpisodeClock {
    pub fn new() -> Self {
        Self {
            frame: 0,
            episode_frame: 0,
            episode_num: 0,
            episode_started: Local::now(),
        }
    }

    /// Advance one simulation tick
    pub fn tick(&mut self) {
        self.frame += 1;
        self.episode_frame += 1;
    }

    /// Open the next episode, stamped with the current local time
    pub fn new_episode(&mut self) {
        self.new_episode_at(Local::now());
    }

    pub fn new_episode_at(&mut self, started: DateTime<Local>) {
        self.episode_frame = 0;
        self.episode_num += 1;
        self.episode_started = started;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn episode_frame(&self) -> u64 {
        self.episode_frame
    }

    pub fn episode_num(&self) -> u64 {
        self.episode_num
    }

    pub fn episode_started(&self) -> DateTime<Local> {
        self.episode_started
    }

    /// `2024-05-01_13-07-42`
    pub fn episode_timestamp(&self) -> String {
        self.episode_started.format(EPISODE_TIMESTAMP_FORMAT).to_string()
    }
}

impl Default for EpisodeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tick_and_new_episode() {
        let mut clock = EpisodeClock::new();
        clock.new_episode();
        assert_eq!(clock.episode_num(), 1);

        for _ in 0..5 {
            clock.tick();
        }
        assert_eq!(clock.frame(), 5);
        assert_eq!(clock.episode_frame(), 5);

        clock.new_episode();
        clock.tick();
        assert_eq!(clock.frame(), 6);
        assert_eq!(clock.episode_frame(), 1);
        assert_eq!(clock.episode_num(), 2);
    }

    #[test]
    fn test_episode_timestamp_format() {
        let mut clock = EpisodeClock::new();
        let started = Local.with_ymd_and_hms(2024, 5, 1, 13, 7, 42).unwrap();
        clock.new_episode_at(started);
        assert_eq!(clock.episode_timestamp(), "2024-05-01_13-07-42");
    }
}

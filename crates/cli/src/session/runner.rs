//! Session runner - ticks the frame loop until a stop condition
//!
//! Stops on the episode limit, the tick budget or the shutdown signal; an
//! in-flight recording is always flushed and written before returning.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{RecorderBlueprint, RecordingState};
use controller::{FrameLoop, MockWorld, MockWorldConfig, RuleBasedPolicy};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::SessionStats;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub blueprint: RecorderBlueprint,

    /// Tick budget (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Pacing between ticks (zero = unpaced)
    pub tick_interval: Duration,

    /// Blend the rule-based policy into the autopilot control
    pub drive_model: bool,
}

pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until a stop condition, then drain the writer
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SessionStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        let mut world = MockWorld::new(MockWorldConfig {
            cameras: blueprint.recording.cameras.clone(),
            ..Default::default()
        });
        let mut frame_loop =
            FrameLoop::new(blueprint).context("Failed to create frame loop")?;
        if self.config.drive_model {
            frame_loop = frame_loop.with_policy(Box::new(RuleBasedPolicy::default()));
        }

        info!("Running in MOCK mode (no CARLA server required)");

        let mut stats = SessionStats::default();
        let mut interval = (!self.config.tick_interval.is_zero()).then(|| {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        tokio::pin!(shutdown);

        loop {
            if self.config.max_ticks.is_some_and(|max| stats.ticks >= max) {
                info!(ticks = stats.ticks, "Tick budget reached");
                break;
            }

            let paced = async {
                match interval.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => tokio::task::yield_now().await,
                }
            };
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping");
                    break;
                }
                _ = paced => {}
            }

            let out = frame_loop.tick(world.frame_context())?;
            stats.record_tick(&out);

            if out.new_episode {
                world.reset();
            }
            match out.recording_state {
                // simulation is paused while an episode is written
                RecordingState::Writing => {
                    if let Some(progress) = out.write_progress {
                        debug!(progress = format!("{:.0}%", progress * 100.0), "Writing episode");
                    }
                }
                _ => world.apply(&out.control),
            }
            if out.exit {
                break;
            }
        }

        if let Some(report) = frame_loop.finish().await? {
            stats.record_report(&report);
        }

        stats.duration = start_time.elapsed();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(output: &std::path::Path) -> SessionConfig {
        let mut blueprint = RecorderBlueprint::default();
        blueprint.recording.output_path = Some(output.to_path_buf());
        blueprint.recording.cameras = vec!["rgb_center".to_string()];
        blueprint.recording.autostart = true;
        blueprint.recording.autostart_after_frames = 1;
        SessionConfig {
            blueprint,
            max_ticks: Some(20),
            tick_interval: Duration::ZERO,
            drive_model: true,
        }
    }

    #[tokio::test]
    async fn test_tick_budget_flushes_recording() {
        let dir = tempdir().unwrap();
        let stats = Session::new(config(dir.path()))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.ticks, 20);
        assert_eq!(stats.episodes, 1);
        let summary = stats.metrics.summary();
        assert_eq!(summary.frames_captured, 19);
        assert_eq!(summary.frames_written, 19);
    }

    #[tokio::test]
    async fn test_episode_limit_ends_session() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.max_ticks = None;
        cfg.blueprint.recording.frame_limit = 5;
        cfg.blueprint.recording.episode_limit = 2;

        let stats = Session::new(cfg).run(std::future::pending()).await.unwrap();
        assert_eq!(stats.episodes, 2);

        let episodes: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(episodes.len(), 2);
        for episode in episodes {
            let log = std::fs::read_to_string(episode.join("driving_log.csv")).unwrap();
            let rows = log.lines().count() - 1;
            assert_eq!(rows, 5);
            let images = std::fs::read_dir(episode.join("imgs")).unwrap().count();
            assert_eq!(images, rows);
        }
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_session() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.max_ticks = None;

        let stats = Session::new(cfg).run(async {}).await.unwrap();
        assert_eq!(stats.ticks, 0);
    }
}

//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置样例加载
//! - 模拟 e2e 测试（MockWorld → FrameLoop → 磁盘，无需 CARLA）
//! - 红绿灯 / 限速解析场景

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    const SAMPLE: &str = r#"
[recording]
output_path = "./recordings"
image_extension = "jpg"
frame_limit = 500
episode_limit = 3
autostart = true
cameras = ["rgb_center", "depth"]

[proximity.traffic_light]
radius = 12.0
yaw_window_deg = 10.0
yaw_offset_deg = 90.0

[proximity.speed_limit]
radius = 12.5
yaw_window_deg = 10.0
yaw_offset_deg = 90.0

[drive_model]
control_brake = true
"#;

    #[test]
    fn test_sample_config_loads() {
        let bp = ConfigLoader::load_from_str(SAMPLE, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.recording.frame_limit, 500);
        assert_eq!(bp.recording.episode_limit, 3);
        assert_eq!(bp.recording.autostart_after_frames, 40);
        assert_eq!(bp.recording.cameras.len(), 2);
        assert_eq!(bp.proximity.speed_limit.radius, 12.5);
        assert!(bp.drive_model.control_brake);
        assert_eq!(bp.drive_model.brake_threshold, 0.3);

        let json = ConfigLoader::to_json(&bp).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(again.recording.image_extension, "jpg");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use contracts::{
        AgentKind, FrameRecord, ImageData, Location, Pose, RawAgent, RawAgentKind,
        RecorderBlueprint, RecordingCommand, RecordingState, Telemetry, TrafficLightState,
    };
    use controller::{FrameContext, FrameLoop, MockWorld, MockWorldConfig, TickOutput};
    use proximity::{ProximityResolver, ResolverMemory};
    use recorder::{
        driving_log_header, AsyncEpisodeWriter, RecordingStateMachine, WriteReport, DRIVING_LOG,
        IMAGE_DIR,
    };
    use tempfile::tempdir;

    const CAMERAS: [&str; 3] = ["depth", "rgb_center", "sem_seg"];

    fn blueprint(output: &Path) -> RecorderBlueprint {
        let mut bp = RecorderBlueprint::default();
        bp.recording.output_path = Some(output.to_path_buf());
        bp.recording.cameras = CAMERAS.iter().map(|c| c.to_string()).collect();
        bp
    }

    fn world(bp: &RecorderBlueprint) -> MockWorld {
        MockWorld::new(MockWorldConfig {
            cameras: bp.recording.cameras.clone(),
            ..Default::default()
        })
    }

    fn read_log(episode: &Path) -> (Vec<String>, Vec<csv::StringRecord>) {
        let mut reader = csv::Reader::from_path(episode.join(DRIVING_LOG)).unwrap();
        let header = reader.headers().unwrap().iter().map(String::from).collect();
        let rows = reader.records().map(Result::unwrap).collect();
        (header, rows)
    }

    /// Drive the mock world until `done` or the tick budget runs out
    async fn drive<F>(
        frame_loop: &mut FrameLoop,
        world: &mut MockWorld,
        max_ticks: usize,
        mut done: F,
    ) -> Vec<TickOutput>
    where
        F: FnMut(&TickOutput) -> bool,
    {
        let mut outputs = Vec::new();
        for _ in 0..max_ticks {
            let out = frame_loop.tick(world.frame_context()).unwrap();
            if out.recording_state != RecordingState::Writing {
                world.apply(&out.control);
            }
            let stop = done(&out);
            outputs.push(out);
            if stop {
                break;
            }
            tokio::task::yield_now().await;
        }
        outputs
    }

    /// Round trip: N recorded frames → N rows and N × cameras images
    #[tokio::test]
    async fn test_recorded_episode_round_trip() {
        let dir = tempdir().unwrap();
        let bp = blueprint(dir.path());
        let mut world = world(&bp);
        let mut frame_loop = FrameLoop::new(&bp).unwrap();

        let mut start = world.frame_context();
        start.commands.push(RecordingCommand::StartRecording);
        let out = frame_loop.tick(start).unwrap();
        assert!(out.captured);
        world.apply(&out.control);

        let n = 12;
        let outputs = drive(&mut frame_loop, &mut world, n - 1, |_| false).await;
        assert!(outputs.iter().all(|o| o.captured));

        let report = frame_loop.finish().await.unwrap().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.frames_written, n);

        let (header, rows) = read_log(&report.episode_path);
        let cameras: Vec<String> = CAMERAS.iter().map(|c| c.to_string()).collect();
        assert_eq!(header, driving_log_header(&cameras));
        assert_eq!(rows.len(), n);

        let images = std::fs::read_dir(report.episode_path.join(IMAGE_DIR))
            .unwrap()
            .count();
        assert_eq!(images, n * CAMERAS.len());

        // rows in frame order, each referencing its own images
        let indices: Vec<u64> = rows.iter().map(|r| r[0].parse().unwrap()).collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        for row in &rows {
            for (col, camera) in CAMERAS.iter().enumerate() {
                let cell = &row[col + 1];
                assert_eq!(cell, format!("{IMAGE_DIR}/{}_{camera}.png", &row[0]));
                assert!(report.episode_path.join(cell).exists());
            }
        }
    }

    fn frame(index: u64) -> FrameRecord {
        let mut images = BTreeMap::new();
        images.insert("rgb".to_string(), ImageData::solid_rgb(2, 2, [9, 9, 9]));
        FrameRecord {
            frame_index: index,
            images,
            telemetry: Telemetry::default(),
        }
    }

    async fn record(sm: &mut RecordingStateMachine, name: &str, frames: std::ops::Range<u64>) -> WriteReport {
        sm.start(name).unwrap();
        for i in frames {
            sm.tick_record(frame(i)).unwrap();
        }
        sm.stop_and_flush().unwrap();
        sm.wait_for_completion().await.unwrap()
    }

    /// Writing twice into the same episode appends rows under one header
    #[tokio::test]
    async fn test_same_episode_appends() {
        let dir = tempdir().unwrap();
        let writer = AsyncEpisodeWriter::new("png").unwrap();
        let mut sm = RecordingStateMachine::new(Some(dir.path().to_path_buf()), writer);

        let first = record(&mut sm, "episode", 0..3).await;
        let second = record(&mut sm, "episode", 3..6).await;
        assert_eq!(first.episode_path, second.episode_path);

        let raw = std::fs::read_to_string(second.episode_path.join(DRIVING_LOG)).unwrap();
        assert_eq!(raw.lines().filter(|l| l.starts_with("Frame,")).count(), 1);

        let (_, rows) = read_log(&second.episode_path);
        let indices: Vec<&str> = rows.iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(indices, ["0", "1", "2", "3", "4", "5"]);
    }

    /// Frame limit flushes each episode; episode limit ends the run
    #[tokio::test]
    async fn test_frame_and_episode_limits() {
        let dir = tempdir().unwrap();
        let mut bp = blueprint(dir.path());
        bp.recording.autostart = true;
        bp.recording.autostart_after_frames = 2;
        bp.recording.frame_limit = 10;
        bp.recording.episode_limit = 2;
        let mut world = world(&bp);
        let mut frame_loop = FrameLoop::new(&bp).unwrap();

        let outputs = tokio::time::timeout(
            Duration::from_secs(30),
            drive(&mut frame_loop, &mut world, 100_000, |o| o.exit),
        )
        .await
        .expect("run timed out");

        assert!(outputs.last().unwrap().exit);
        let reports: Vec<&WriteReport> = outputs
            .iter()
            .filter_map(|o| o.completed_write.as_ref())
            .collect();
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert!(report.is_complete());
            assert_eq!(report.frames_written, 9);
        }
        assert_eq!(outputs.iter().filter(|o| o.captured).count(), 18);
        assert_eq!(outputs.iter().filter(|o| o.new_episode).count(), 2);

        // each episode keeps its own directory, rows and images
        let episodes: Vec<&PathBuf> = reports.iter().map(|r| &r.episode_path).collect();
        assert_ne!(episodes[0], episodes[1]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        for episode in episodes {
            let (_, rows) = read_log(episode);
            assert_eq!(rows.len(), 9);
            let images = std::fs::read_dir(episode.join(IMAGE_DIR)).unwrap().count();
            assert_eq!(images, rows.len() * CAMERAS.len());
            for row in &rows {
                for col in 1..=CAMERAS.len() {
                    assert!(episode.join(&row[col]).exists());
                }
            }
        }
    }

    fn light(id: u32, location: Location, state: TrafficLightState) -> RawAgent {
        RawAgent {
            id: Some(id),
            kind: Some(RawAgentKind::TrafficLight),
            location: Some(location),
            yaw: Some(90.0),
            state: Some(state.code()),
            speed_limit: None,
        }
    }

    fn at(x: f64, agents: Vec<RawAgent>) -> FrameContext {
        FrameContext {
            agents,
            pose: Pose {
                location: Location::new(x, 0.0, 0.0),
                yaw: 0.0,
            },
            ..Default::default()
        }
    }

    /// NONE before anything is observed, GREEN once agents exist but none governs
    #[tokio::test]
    async fn test_unobserved_then_clear_light() {
        let dir = tempdir().unwrap();
        let bp = blueprint(dir.path());
        let mut frame_loop = FrameLoop::new(&bp).unwrap();

        let out = frame_loop.tick(at(0.0, Vec::new())).unwrap();
        assert_eq!(out.light_state(), TrafficLightState::None);

        let far = light(1, Location::new(100.0, 0.0, 0.0), TrafficLightState::Red);
        let out = frame_loop.tick(at(0.0, vec![far])).unwrap();
        assert_eq!(out.light_state(), TrafficLightState::Green);
        assert!(out.traffic_light.proximity.is_none());

        // same through the mock world: lights exist, none within radius at the start
        let mut world = world(&bp);
        let out = frame_loop.tick(world.frame_context()).unwrap();
        world.apply(&out.control);
        assert_eq!(out.light_state(), TrafficLightState::Green);
    }

    /// A slightly farther light does not steal the selection
    #[tokio::test]
    async fn test_hysteresis_keeps_previous_light() {
        let dir = tempdir().unwrap();
        let mut frame_loop = FrameLoop::new(&blueprint(dir.path())).unwrap();

        let red = |x: f64| light(1, Location::new(x, 0.0, 0.0), TrafficLightState::Red);
        let green = light(2, Location::new(0.0, 5.2, 0.0), TrafficLightState::Green);

        let out = frame_loop.tick(at(0.0, vec![red(5.0), green.clone()])).unwrap();
        assert_eq!(out.light_state(), TrafficLightState::Red);
        assert_eq!(out.traffic_light.proximity.distance(), Some(5.0));

        // light 1 moves to 5.5; light 2 at 5.2 is nearer but not nearer than 5.0
        let out = frame_loop.tick(at(0.0, vec![red(5.5), green])).unwrap();
        assert_eq!(out.light_state(), TrafficLightState::Red);
        assert_eq!(out.traffic_light.proximity.selected().map(|a| a.id), Some(1));
        let d = out.traffic_light.proximity.distance().unwrap();
        assert!((d - 5.2).abs() < 1e-9);
    }

    /// Resolver alone: nearest valid light within the radius wins
    #[test]
    fn test_resolver_selects_within_radius() {
        let settings = RecorderBlueprint::default().proximity;
        let mut resolver = ProximityResolver::new(settings);
        let mut memory = ResolverMemory::default();
        let pose = Pose::default();

        let agents = contracts::ingest_agents(&[
            light(1, Location::new(11.0, 0.0, 0.0), TrafficLightState::Yellow),
            light(2, Location::new(12.5, 0.0, 0.0), TrafficLightState::Red),
        ]);
        let res = resolver.resolve(AgentKind::TrafficLight, &agents, &pose, &mut memory);
        assert_eq!(res.reading.traffic_light(), Some(TrafficLightState::Yellow));
        assert_eq!(res.proximity.distance(), Some(11.0));
    }
}

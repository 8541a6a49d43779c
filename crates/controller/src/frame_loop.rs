//! FrameLoop - one call per simulation tick
//!
//! Order within a tick:
//! 1. drain writer completion
//! 2. recording commands (ignored while `Writing`)
//! 3. autostart
//! 4. advance the clock and open a pending episode (skipped while `Writing`)
//! 5. resolve traffic light and speed limit
//! 6. drive policy blend
//! 7. buffer the frame while `Recording`
//! 8. frame limit

use std::collections::BTreeMap;

use contracts::{
    ingest_agents, AgentKind, DriveModelSettings, DrivePolicy, EpisodeStore, FrameRecord,
    HighLevelCommand, ImageData, PolicyInput, ProximityResult, RecorderBlueprint, RecordingCommand,
    RecordingConfig, RecordingState, Resolution, Telemetry, TrafficLightState, VehicleControl,
};
use proximity::{unobserved_reading, ProximityResolver, ResolverMemory};
use recorder::{AsyncEpisodeWriter, DiskEpisodeStore, RecorderError, RecordingStateMachine, WriteReport};
use tracing::{debug, info, warn};

use crate::policy::blend_control;
use crate::{ControllerError, EpisodeClock, FrameContext, TickOutput};

pub struct FrameLoop<S = DiskEpisodeStore> {
    recording: RecordingConfig,
    drive_model: DriveModelSettings,
    resolver: ProximityResolver,
    light_memory: ResolverMemory,
    sign_memory: ResolverMemory,
    recorder: RecordingStateMachine<S>,
    clock: EpisodeClock,
    /// Directory name of the current episode under the output root
    episode_name: String,
    policy: Option<Box<dyn DrivePolicy>>,
    drive_model_enabled: bool,
    hlc: HighLevelCommand,
    /// Sticky speed limit (km/h)
    speed_limit: u32,
    last_light: Resolution,
    last_sign: Resolution,
    new_episode_pending: bool,
    exit_requested: bool,
}

impl FrameLoop<DiskEpisodeStore> {
    /// Build a loop writing episodes to disk
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(blueprint: &RecorderBlueprint) -> Result<Self, ControllerError> {
        let writer = AsyncEpisodeWriter::new(blueprint.recording.image_extension.clone())?;
        let recorder = RecordingStateMachine::new(blueprint.recording.output_path.clone(), writer);
        Ok(Self::with_recorder(blueprint, recorder))
    }
}

impl<S> FrameLoop<S>
where
    S: EpisodeStore + Clone + Send + 'static,
{
    /// Build a loop around an existing recorder; opens episode 1
    pub fn with_recorder(blueprint: &RecorderBlueprint, recorder: RecordingStateMachine<S>) -> Self {
        let mut clock = EpisodeClock::new();
        clock.new_episode();

        let mut frame_loop = Self {
            recording: blueprint.recording.clone(),
            drive_model: blueprint.drive_model,
            resolver: ProximityResolver::new(blueprint.proximity),
            light_memory: ResolverMemory::default(),
            sign_memory: ResolverMemory::default(),
            recorder,
            clock,
            episode_name: String::new(),
            policy: None,
            drive_model_enabled: false,
            hlc: HighLevelCommand::FollowRoad,
            speed_limit: blueprint.recording.default_speed_limit,
            last_light: unobserved(AgentKind::TrafficLight),
            last_sign: unobserved(AgentKind::SpeedLimitSign),
            new_episode_pending: false,
            exit_requested: false,
        };
        frame_loop.episode_name = frame_loop.episode_dir_name();
        frame_loop
    }

    /// Attach a drive policy and enable it
    pub fn with_policy(mut self, policy: Box<dyn DrivePolicy>) -> Self {
        self.policy = Some(policy);
        self.drive_model_enabled = true;
        self
    }

    /// Toggle the drive policy; resets the high-level command
    pub fn set_drive_model_enabled(&mut self, enabled: bool) {
        if self.policy.is_none() {
            return;
        }
        self.drive_model_enabled = enabled;
        self.hlc = HighLevelCommand::FollowRoad;
    }

    pub fn clock(&self) -> &EpisodeClock {
        &self.clock
    }

    pub fn recorder(&self) -> &RecordingStateMachine<S> {
        &self.recorder
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    /// Directory name the current episode records into
    pub fn episode_name(&self) -> &str {
        &self.episode_name
    }

    pub fn hlc(&self) -> HighLevelCommand {
        self.hlc
    }

    pub fn displayed_speed_limit(&self) -> u32 {
        self.speed_limit
    }

    /// Run one tick
    ///
    /// # Errors
    /// Only recorder transitions can fail; policy failures are logged and
    /// the driver's control is kept.
    pub fn tick(&mut self, ctx: FrameContext) -> Result<TickOutput, ControllerError> {
        let completed_write = self.recorder.poll_completion();

        if self.exit_requested {
            return Ok(self.output(ctx.control, false, completed_write, false));
        }

        let FrameContext {
            agents,
            pose,
            forward_speed_mps,
            control,
            autopilot_control,
            autopilot_enabled,
            images,
            commands,
        } = ctx;

        if self.is_writing() {
            if !commands.is_empty() {
                debug!(count = commands.len(), "Ignoring commands while writing");
            }
        } else {
            for command in commands {
                self.handle_command(command)?;
            }
        }

        if self.recording.autostart
            && self.recorder.state() == RecordingState::Idle
            && self.clock.episode_frame() == self.recording.autostart_after_frames
        {
            self.start_recording()?;
        }

        let mut applied = control;
        let mut captured = false;
        let mut new_episode = false;

        if !self.is_writing() {
            self.clock.tick();
            if self.new_episode_pending {
                self.open_episode();
                new_episode = true;
                if self.exit_requested {
                    return Ok(self.output(control, false, completed_write, true));
                }
            }

            let agents = ingest_agents(&agents);
            self.last_light = self.resolver.resolve(
                AgentKind::TrafficLight,
                &agents,
                &pose,
                &mut self.light_memory,
            );
            self.last_sign = self.resolver.resolve(
                AgentKind::SpeedLimitSign,
                &agents,
                &pose,
                &mut self.sign_memory,
            );
            if let Some(limit) = self.last_sign.reading.speed_limit() {
                self.speed_limit = limit;
            }

            let speed_kmh = forward_speed_mps * 3.6;
            applied = self.apply_policy(&images, speed_kmh, control);

            if self.recorder.state() == RecordingState::Recording {
                let frame = FrameRecord {
                    frame_index: self.clock.episode_frame(),
                    images: images
                        .into_iter()
                        .filter(|(name, _)| self.recording.cameras.contains(name))
                        .collect(),
                    telemetry: Telemetry {
                        location: pose.location,
                        speed_kmh,
                        controls: applied,
                        autopilot_controls: autopilot_control,
                        hlc: self.hlc,
                        speed_limit: self.speed_limit,
                        traffic_light: light_state(&self.last_light),
                        autopilot_enabled,
                        weather_id: self.recording.weather_id,
                    },
                };
                self.recorder.tick_record(frame)?;
                captured = true;
            }
        }

        let frame_limit = self.recording.frame_limit;
        if frame_limit != 0 && frame_limit < self.clock.episode_frame() {
            if self.recorder.state() == RecordingState::Recording {
                self.recorder.stop_and_flush()?;
            }
            self.new_episode_pending = true;
        }

        Ok(self.output(applied, captured, completed_write, new_episode))
    }

    /// Flush a running recording and wait for any in-flight write
    pub async fn finish(&mut self) -> Result<Option<WriteReport>, ControllerError> {
        if self.recorder.state() == RecordingState::Recording {
            self.recorder.stop_and_flush()?;
        }
        Ok(self.recorder.wait_for_completion().await)
    }

    fn is_writing(&self) -> bool {
        self.recorder.state() == RecordingState::Writing
    }

    fn handle_command(&mut self, command: RecordingCommand) -> Result<(), ControllerError> {
        match command {
            RecordingCommand::StartRecording => match self.recorder.state() {
                RecordingState::Idle => self.start_recording()?,
                state => debug!(%state, "Already recording"),
            },
            RecordingCommand::StopRecording => match self.recorder.state() {
                RecordingState::Recording => self.recorder.stop_and_flush()?,
                state => debug!(%state, "Not recording"),
            },
            RecordingCommand::NewEpisode => {
                if self.recorder.state() == RecordingState::Recording {
                    self.recorder.stop_and_flush()?;
                }
                self.new_episode_pending = true;
            }
            RecordingCommand::SetHighLevelCommand(hlc) => {
                debug!(?hlc, "High-level command set");
                self.hlc = hlc;
            }
        }
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), ControllerError> {
        match self.recorder.start(&self.episode_name) {
            Ok(_) => Ok(()),
            Err(RecorderError::NoDestination) => {
                warn!("No output path configured, recording disabled");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn open_episode(&mut self) {
        self.new_episode_pending = false;
        self.clock.new_episode();

        let limit = self.recording.episode_limit;
        let episode = self.clock.episode_num();
        if limit != 0 && limit < episode {
            info!(episodes = limit, "Episode limit reached");
            self.exit_requested = true;
            return;
        }

        self.episode_name = self.episode_dir_name();
        self.light_memory.reset();
        self.sign_memory.reset();
        self.last_light = unobserved(AgentKind::TrafficLight);
        self.last_sign = unobserved(AgentKind::SpeedLimitSign);
        self.speed_limit = self.recording.default_speed_limit;
        self.hlc = HighLevelCommand::FollowRoad;
        info!(episode, name = %self.episode_name, "New episode");
    }

    /// Start timestamp of the episode, suffixed `_2`, `_3`, ... when the
    /// previous episode or an existing directory already has that name
    fn episode_dir_name(&self) -> String {
        let stamp = self.clock.episode_timestamp();
        let taken = |name: &str| {
            name == self.episode_name
                || self
                    .recorder
                    .output_root()
                    .is_some_and(|root| root.join(name).exists())
        };
        if !taken(&stamp) {
            return stamp;
        }
        let free = (2u64..)
            .map(|n| format!("{stamp}_{n}"))
            .find(|name| !taken(name));
        free.unwrap_or(stamp)
    }

    fn apply_policy(
        &mut self,
        images: &BTreeMap<String, ImageData>,
        speed_kmh: f64,
        control: VehicleControl,
    ) -> VehicleControl {
        if !self.drive_model_enabled {
            return control;
        }
        let Some(policy) = self.policy.as_mut() else {
            return control;
        };

        let input = PolicyInput {
            speed_kmh,
            speed_limit: self.speed_limit,
            traffic_light: light_state(&self.last_light),
            hlc: self.hlc,
        };
        match policy.predict(images, &input).map_err(ControllerError::Policy) {
            Ok(output) => blend_control(control, &output, &self.drive_model),
            Err(e) => {
                warn!(error = %e, "Keeping driver control");
                control
            }
        }
    }

    fn output(
        &self,
        control: VehicleControl,
        captured: bool,
        completed_write: Option<WriteReport>,
        new_episode: bool,
    ) -> TickOutput {
        TickOutput {
            traffic_light: self.last_light,
            speed_limit: self.last_sign,
            displayed_speed_limit: self.speed_limit,
            recording_state: self.recorder.state(),
            write_progress: self.recorder.write_progress(),
            control,
            captured,
            completed_write,
            new_episode,
            exit: self.exit_requested,
        }
    }
}

fn unobserved(kind: AgentKind) -> Resolution {
    Resolution::new(unobserved_reading(kind), ProximityResult::none())
}

fn light_state(resolution: &Resolution) -> TrafficLightState {
    resolution
        .reading
        .traffic_light()
        .unwrap_or(TrafficLightState::None)
}

//! Per-tick inputs and outputs of the frame loop

use std::collections::BTreeMap;

use contracts::{
    ImageData, Pose, RawAgent, RecordingCommand, RecordingState, Resolution, TrafficLightState,
    VehicleControl,
};
use recorder::WriteReport;

/// Everything the frame loop consumes in one tick
#[derive(Debug, Clone, Default)]
pub struct FrameContext {
    /// Non-player agent report from the simulator
    pub agents: Vec<RawAgent>,
    pub pose: Pose,
    /// Forward speed (m/s)
    pub forward_speed_mps: f64,
    /// Control from the active driver (keyboard, joystick or autopilot)
    pub control: VehicleControl,
    pub autopilot_control: VehicleControl,
    pub autopilot_enabled: bool,
    /// Camera images keyed by camera name
    pub images: BTreeMap<String, ImageData>,
    pub commands: Vec<RecordingCommand>,
}

/// Result of one tick
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub traffic_light: Resolution,
    pub speed_limit: Resolution,
    /// Sticky speed limit (km/h): last observed sign or the episode default
    pub displayed_speed_limit: u32,
    pub recording_state: RecordingState,
    /// Fraction written, while `Writing`
    pub write_progress: Option<f64>,
    /// Control to send to the vehicle
    pub control: VehicleControl,
    /// A frame was buffered this tick
    pub captured: bool,
    /// Write completion observed this tick
    pub completed_write: Option<WriteReport>,
    /// A new episode was opened this tick
    pub new_episode: bool,
    /// Episode limit reached; the caller should stop
    pub exit: bool,
}

impl TickOutput {
    /// Traffic light state used for display and telemetry
    pub fn light_state(&self) -> TrafficLightState {
        self.traffic_light
            .reading
            .traffic_light()
            .unwrap_or(TrafficLightState::None)
    }
}

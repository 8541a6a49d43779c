//! MockWorld - scripted straight road for running without a simulator
//!
//! The vehicle drives along +x with yaw 0. Traffic lights stand beside the
//! road every `light_spacing` metres facing the vehicle and cycle
//! Green → Yellow → Red; speed signs stand halfway between lights. A few
//! vehicles, pedestrians and one malformed record are mixed into the agent
//! report. The world only advances in [`MockWorld::apply`].

use std::collections::BTreeMap;

use bytes::Bytes;
use contracts::{
    AgentId, ImageData, ImageFormat, Location, Pose, RawAgent, RawAgentKind, TrafficLightState,
    VehicleControl,
};

/// Tunables of the scripted road
#[derive(Debug, Clone)]
pub struct MockWorldConfig {
    /// Seconds per tick
    pub dt: f64,
    pub road_length: f64,
    pub light_spacing: f64,
    /// Lateral offset of lights and signs from the lane centre
    pub roadside_offset: f64,
    pub green_ticks: u64,
    pub yellow_ticks: u64,
    pub red_ticks: u64,
    /// Autopilot cruise speed (m/s)
    pub cruise_speed: f64,
    pub image_width: u32,
    pub image_height: u32,
    pub cameras: Vec<String>,
}

impl Default for MockWorldConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            road_length: 600.0,
            light_spacing: 60.0,
            roadside_offset: 3.0,
            green_ticks: 60,
            yellow_ticks: 20,
            red_ticks: 40,
            cruise_speed: 8.0,
            image_width: 8,
            image_height: 6,
            cameras: Vec::new(),
        }
    }
}

/// Sign limits as the simulator reports them (m/s)
const SIGN_LIMITS_MPS: [f64; 3] = [8.34, 13.9, 16.67];

const LIGHT_ID_BASE: AgentId = 1;
const SIGN_ID_BASE: AgentId = 100;
const TRAFFIC_ID_BASE: AgentId = 1000;

/// Facing the vehicle driving at yaw 0
const ROADSIDE_YAW: f64 = 90.0;

#[derive(Debug)]
pub struct MockWorld {
    config: MockWorldConfig,
    tick: u64,
    x: f64,
    speed: f64,
    lights: Vec<Location>,
    signs: Vec<(Location, f64)>,
}

impl MockWorld {
    pub fn new(config: MockWorldConfig) -> Self {
        let spacing = config.light_spacing.max(1.0);
        let count = (config.road_length / spacing).floor() as usize;
        let lights = (1..=count)
            .map(|i| Location::new(i as f64 * spacing, config.roadside_offset, 0.0))
            .collect();
        let signs = (0..count)
            .map(|i| {
                let x = i as f64 * spacing + spacing / 2.0;
                let limit = SIGN_LIMITS_MPS[i % SIGN_LIMITS_MPS.len()];
                (Location::new(x, -config.roadside_offset, 0.0), limit)
            })
            .collect();

        Self {
            config,
            tick: 0,
            x: 0.0,
            speed: 0.0,
            lights,
            signs,
        }
    }

    pub fn config(&self) -> &MockWorldConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn pose(&self) -> Pose {
        Pose {
            location: Location::new(self.x, 0.0, 0.0),
            yaw: 0.0,
        }
    }

    /// Forward speed (m/s)
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Put the vehicle back at the start of the road
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.speed = 0.0;
    }

    /// State of light `index` at the current tick
    pub fn light_state(&self, index: usize) -> TrafficLightState {
        let period = self.config.green_ticks + self.config.yellow_ticks + self.config.red_ticks;
        if period == 0 {
            return TrafficLightState::Green;
        }
        // stagger neighbouring lights
        let phase = (self.tick + index as u64 * 37) % period;
        if phase < self.config.green_ticks {
            TrafficLightState::Green
        } else if phase < self.config.green_ticks + self.config.yellow_ticks {
            TrafficLightState::Yellow
        } else {
            TrafficLightState::Red
        }
    }

    /// Non-player agent report for the current tick
    pub fn agents(&self) -> Vec<RawAgent> {
        let mut report: Vec<RawAgent> = self
            .lights
            .iter()
            .enumerate()
            .map(|(i, location)| RawAgent {
                id: Some(LIGHT_ID_BASE + i as AgentId),
                kind: Some(RawAgentKind::TrafficLight),
                location: Some(*location),
                yaw: Some(ROADSIDE_YAW),
                state: Some(self.light_state(i).code()),
                speed_limit: None,
            })
            .collect();

        report.extend(self.signs.iter().enumerate().map(|(i, (location, limit))| RawAgent {
            id: Some(SIGN_ID_BASE + i as AgentId),
            kind: Some(RawAgentKind::SpeedLimitSign),
            location: Some(*location),
            yaw: Some(ROADSIDE_YAW),
            state: None,
            speed_limit: Some(*limit),
        }));

        // oncoming car and a pedestrian on the sidewalk
        let t = self.tick as f64 * self.config.dt;
        report.push(RawAgent {
            id: Some(TRAFFIC_ID_BASE),
            kind: Some(RawAgentKind::Vehicle),
            location: Some(Location::new(self.config.road_length - 5.0 * t, -3.5, 0.0)),
            yaw: Some(180.0),
            ..Default::default()
        });
        report.push(RawAgent {
            id: Some(TRAFFIC_ID_BASE + 1),
            kind: Some(RawAgentKind::Pedestrian),
            location: Some(Location::new(20.0 + 1.2 * t, 5.0, 0.0)),
            yaw: Some(0.0),
            ..Default::default()
        });
        // light without a state code; dropped at ingestion
        report.push(RawAgent {
            id: Some(TRAFFIC_ID_BASE + 2),
            kind: Some(RawAgentKind::TrafficLight),
            location: Some(Location::new(-50.0, 0.0, 0.0)),
            yaw: Some(ROADSIDE_YAW),
            ..Default::default()
        });
        report
    }

    /// Control the autopilot would apply
    ///
    /// Brakes for a red or yellow light within braking distance ahead,
    /// otherwise holds the cruise speed.
    pub fn autopilot_control(&self) -> VehicleControl {
        let stop_ahead = self.lights.iter().enumerate().any(|(i, l)| {
            let ahead = l.x - self.x;
            ahead > 0.0
                && ahead < 15.0
                && matches!(
                    self.light_state(i),
                    TrafficLightState::Red | TrafficLightState::Yellow
                )
        });

        if stop_ahead {
            VehicleControl {
                brake: 1.0,
                ..Default::default()
            }
        } else if self.speed < self.config.cruise_speed {
            VehicleControl {
                throttle: 0.7,
                ..Default::default()
            }
        } else {
            VehicleControl::default()
        }
    }

    /// One solid image per configured camera
    pub fn images(&self) -> BTreeMap<String, ImageData> {
        let (w, h) = (self.config.image_width, self.config.image_height);
        let shade = (self.tick % 256) as u8;
        self.config
            .cameras
            .iter()
            .map(|name| {
                let image = if name.contains("depth") {
                    solid(w, h, ImageFormat::Gray8, &[shade])
                } else if name.contains("sem_seg") {
                    solid(w, h, ImageFormat::Bgra8, &[shade, 0, 128, 255])
                } else {
                    ImageData::solid_rgb(w, h, [shade, 96, 160])
                };
                (name.clone(), image)
            })
            .collect()
    }

    /// Snapshot of the current tick as the frame loop consumes it
    pub fn frame_context(&self) -> crate::FrameContext {
        let autopilot = self.autopilot_control();
        crate::FrameContext {
            agents: self.agents(),
            pose: self.pose(),
            forward_speed_mps: self.speed,
            control: autopilot,
            autopilot_control: autopilot,
            autopilot_enabled: true,
            images: self.images(),
            commands: Vec::new(),
        }
    }

    /// Apply `control` and advance one tick
    pub fn apply(&mut self, control: &VehicleControl) {
        let dt = self.config.dt;
        let accel = control.throttle.clamp(0.0, 1.0) * 4.0 - control.brake.clamp(0.0, 1.0) * 8.0 - 0.2;
        self.speed = (self.speed + accel * dt).clamp(0.0, 25.0);
        self.x += self.speed * dt;
        if self.x > self.config.road_length {
            self.x -= self.config.road_length;
        }
        self.tick += 1;
    }
}

fn solid(width: u32, height: u32, format: ImageFormat, pixel: &[u8]) -> ImageData {
    let data: Vec<u8> = pixel
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * pixel.len())
        .collect();
    ImageData {
        width,
        height,
        format,
        data: Bytes::from(data),
    }
}

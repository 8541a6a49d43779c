//! FrameRecord - one tick of captured camera images and telemetry
//!
//! Created once per tick while recording, immutable afterwards.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Location, TrafficLightState};

/// Camera image buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Raw pixel data
    pub data: Bytes,
}

impl ImageData {
    /// Solid-colour RGB image
    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data: Vec<u8> = std::iter::repeat(rgb)
            .take((width * height) as usize)
            .flatten()
            .collect();
        Self {
            width,
            height,
            format: ImageFormat::Rgb8,
            data: Bytes::from(data),
        }
    }

    /// Bytes per pixel of the format
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }
}

/// Image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Rgba8,
    /// CARLA native camera layout
    Bgra8,
    /// Depth / log-depth rendered to grayscale
    Gray8,
}

impl ImageFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 | ImageFormat::Bgra8 => 4,
            ImageFormat::Gray8 => 1,
        }
    }
}

/// Vehicle control command
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    pub steer: f64,
    pub throttle: f64,
    pub brake: f64,
    pub hand_brake: bool,
    pub reverse: bool,
}

/// Driving-intent label attached to frames for model training
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HighLevelCommand {
    #[default]
    FollowRoad = 0,
    TurnLeft = 1,
    TurnRight = 2,
    StraightAhead = 3,
}

impl HighLevelCommand {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Telemetry row of a recorded frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Vehicle location
    pub location: Location,

    /// Forward speed (km/h)
    pub speed_kmh: f64,

    /// Controls applied to the vehicle
    pub controls: VehicleControl,

    /// Controls suggested by the simulator autopilot
    pub autopilot_controls: VehicleControl,

    /// High-level command
    pub hlc: HighLevelCommand,

    /// Resolved speed limit (km/h)
    pub speed_limit: u32,

    /// Resolved traffic light state
    pub traffic_light: TrafficLightState,

    /// Whether the autopilot was driving
    pub autopilot_enabled: bool,

    /// Simulator weather preset id
    pub weather_id: u32,
}

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Frame index within the episode
    pub frame_index: u64,

    /// Camera images (camera name -> image)
    pub images: BTreeMap<String, ImageData>,

    /// Telemetry row
    pub telemetry: Telemetry,
}

impl FrameRecord {
    /// Image file name for a camera of this frame
    pub fn image_file_name(&self, camera: &str, extension: &str) -> String {
        format!("{}_{}.{}", self.frame_index, camera, extension)
    }
}

//! RecorderBlueprint - Config Loader output
//!
//! Describes recording destination and limits, per-kind proximity settings
//! and drive-model blending.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::AgentKind;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete recorder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecorderBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Recording settings
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Proximity resolution settings
    #[serde(default)]
    pub proximity: ProximitySettings,

    /// Drive model blending
    #[serde(default)]
    pub drive_model: DriveModelSettings,
}

/// Recording settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Root directory for episodes; recording is disabled when absent
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Image file extension (png / jpg / jpeg / bmp)
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Frames per episode before an automatic flush (0 = unlimited)
    #[serde(default)]
    pub frame_limit: u64,

    /// Number of episodes before the loop exits (0 = unlimited)
    #[serde(default)]
    pub episode_limit: u64,

    /// Start recording automatically after `autostart_after_frames`
    #[serde(default)]
    pub autostart: bool,

    #[serde(default = "default_autostart_after_frames")]
    pub autostart_after_frames: u64,

    /// Speed limit assumed at episode start (km/h)
    #[serde(default = "default_speed_limit")]
    pub default_speed_limit: u32,

    /// Weather preset id written to telemetry
    #[serde(default = "default_weather_id")]
    pub weather_id: u32,

    /// Cameras captured per frame
    #[serde(default = "default_cameras")]
    pub cameras: Vec<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            image_extension: default_image_extension(),
            frame_limit: 0,
            episode_limit: 0,
            autostart: false,
            autostart_after_frames: default_autostart_after_frames(),
            default_speed_limit: default_speed_limit(),
            weather_id: default_weather_id(),
            cameras: default_cameras(),
        }
    }
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_autostart_after_frames() -> u64 {
    40
}

fn default_speed_limit() -> u32 {
    30
}

fn default_weather_id() -> u32 {
    1
}

fn default_cameras() -> Vec<String> {
    ["rgb_center", "rgb_left", "rgb_right", "depth", "sem_seg"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Proximity settings for one agent kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindSettings {
    /// Search radius around the vehicle
    pub radius: f64,

    /// Half-width of the open orientation window (degrees)
    #[serde(default = "default_yaw_window")]
    pub yaw_window_deg: f64,

    /// Mounting offset subtracted from the wrapped yaw difference (degrees)
    #[serde(default = "default_yaw_offset")]
    pub yaw_offset_deg: f64,
}

fn default_yaw_window() -> f64 {
    10.0
}

fn default_yaw_offset() -> f64 {
    90.0
}

/// Proximity settings per agent kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximitySettings {
    #[serde(default = "default_traffic_light_settings")]
    pub traffic_light: KindSettings,

    #[serde(default = "default_speed_limit_settings")]
    pub speed_limit: KindSettings,
}

impl ProximitySettings {
    pub fn for_kind(&self, kind: AgentKind) -> &KindSettings {
        match kind {
            AgentKind::TrafficLight => &self.traffic_light,
            AgentKind::SpeedLimitSign => &self.speed_limit,
        }
    }
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            traffic_light: default_traffic_light_settings(),
            speed_limit: default_speed_limit_settings(),
        }
    }
}

fn default_traffic_light_settings() -> KindSettings {
    KindSettings {
        radius: 12.0,
        yaw_window_deg: default_yaw_window(),
        yaw_offset_deg: default_yaw_offset(),
    }
}

fn default_speed_limit_settings() -> KindSettings {
    KindSettings {
        radius: 12.5,
        yaw_window_deg: default_yaw_window(),
        yaw_offset_deg: default_yaw_offset(),
    }
}

/// Which policy outputs override the driver's controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveModelSettings {
    #[serde(default)]
    pub control_steer: bool,

    #[serde(default)]
    pub control_throttle: bool,

    #[serde(default)]
    pub control_brake: bool,

    /// Policy brake is applied only above this value
    #[serde(default = "default_brake_threshold")]
    pub brake_threshold: f64,
}

impl Default for DriveModelSettings {
    fn default() -> Self {
        Self {
            control_steer: false,
            control_throttle: false,
            control_brake: false,
            brake_threshold: default_brake_threshold(),
        }
    }
}

fn default_brake_threshold() -> f64 {
    0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bp = RecorderBlueprint::default();
        assert!(bp.recording.output_path.is_none());
        assert_eq!(bp.recording.cameras.len(), 5);
        assert_eq!(bp.proximity.traffic_light.radius, 12.0);
        assert_eq!(bp.proximity.speed_limit.radius, 12.5);
        assert_eq!(bp.proximity.for_kind(AgentKind::TrafficLight).yaw_window_deg, 10.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let bp: RecorderBlueprint =
            serde_json::from_str(r#"{"recording": {"frame_limit": 100}}"#).unwrap();
        assert_eq!(bp.recording.frame_limit, 100);
        assert_eq!(bp.recording.image_extension, "png");
        assert_eq!(bp.proximity.speed_limit.yaw_offset_deg, 90.0);
    }
}

//! Agent - per-tick non-player agent snapshot
//!
//! The simulator reports every non-player agent each tick. Only traffic
//! lights and speed-limit signs matter here; they are resolved once at
//! ingestion into the tagged [`Agent`] type.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ContractError;

/// Simulator agent handle
pub type AgentId = u32;

/// 3D location in world units (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another location
    pub fn distance(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Pose of the controlled vehicle (yaw in degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub location: Location,
    pub yaw: f64,
}

/// Traffic-control agent kinds tracked by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    TrafficLight,
    SpeedLimitSign,
}

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::TrafficLight, AgentKind::SpeedLimitSign];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::TrafficLight => "traffic_light",
            AgentKind::SpeedLimitSign => "speed_limit_sign",
        }
    }
}

/// Traffic light state
///
/// Numeric codes are what the telemetry table stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TrafficLightState {
    Green = 0,
    Yellow = 1,
    Red = 2,
    Error = 3,
    /// No light observed yet
    #[default]
    None = 4,
}

impl TrafficLightState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            TrafficLightState::Green => "GREEN",
            TrafficLightState::Yellow => "YELLOW",
            TrafficLightState::Red => "RED",
            TrafficLightState::Error => "ERROR",
            TrafficLightState::None => "NONE",
        }
    }
}

impl TryFrom<u8> for TrafficLightState {
    type Error = ContractError;

    fn try_from(code: u8) -> Result<Self, ContractError> {
        match code {
            0 => Ok(TrafficLightState::Green),
            1 => Ok(TrafficLightState::Yellow),
            2 => Ok(TrafficLightState::Red),
            3 => Ok(TrafficLightState::Error),
            4 => Ok(TrafficLightState::None),
            other => Err(ContractError::malformed_agent(
                None,
                format!("unknown traffic light state code {other}"),
            )),
        }
    }
}

/// Kind-specific agent data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentPayload {
    TrafficLight { state: TrafficLightState },
    SpeedLimitSign { limit_mps: f64 },
}

/// Traffic-control agent observed this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub location: Location,
    /// Yaw in degrees
    pub yaw: f64,
    pub payload: AgentPayload,
}

impl Agent {
    pub fn traffic_light(id: AgentId, location: Location, yaw: f64, state: TrafficLightState) -> Self {
        Self {
            id,
            location,
            yaw,
            payload: AgentPayload::TrafficLight { state },
        }
    }

    pub fn speed_limit_sign(id: AgentId, location: Location, yaw: f64, limit_mps: f64) -> Self {
        Self {
            id,
            location,
            yaw,
            payload: AgentPayload::SpeedLimitSign { limit_mps },
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self.payload {
            AgentPayload::TrafficLight { .. } => AgentKind::TrafficLight,
            AgentPayload::SpeedLimitSign { .. } => AgentKind::SpeedLimitSign,
        }
    }
}

/// Kind tag as reported by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawAgentKind {
    Vehicle,
    Pedestrian,
    TrafficLight,
    SpeedLimitSign,
}

/// Loosely-typed non-player agent record as reported by the simulator
///
/// Every field is optional; validation happens in [`Agent::try_from`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAgent {
    pub id: Option<AgentId>,
    pub kind: Option<RawAgentKind>,
    pub location: Option<Location>,
    pub yaw: Option<f64>,
    /// Traffic light state code
    pub state: Option<u8>,
    /// Speed limit in m/s
    pub speed_limit: Option<f64>,
}

impl TryFrom<&RawAgent> for Agent {
    type Error = ContractError;

    fn try_from(raw: &RawAgent) -> Result<Self, ContractError> {
        let id = raw
            .id
            .ok_or_else(|| ContractError::malformed_agent(None, "missing id"))?;
        let missing = |field: &str| ContractError::malformed_agent(Some(id), format!("missing {field}"));

        let kind = raw.kind.ok_or_else(|| missing("kind"))?;
        let location = raw.location.ok_or_else(|| missing("location"))?;
        let yaw = raw.yaw.ok_or_else(|| missing("yaw"))?;

        if !(location.x.is_finite() && location.y.is_finite() && location.z.is_finite()) {
            return Err(ContractError::malformed_agent(Some(id), "non-finite location"));
        }
        if !yaw.is_finite() {
            return Err(ContractError::malformed_agent(Some(id), "non-finite yaw"));
        }

        let payload = match kind {
            RawAgentKind::TrafficLight => {
                let code = raw.state.ok_or_else(|| missing("state"))?;
                let state = TrafficLightState::try_from(code)
                    .map_err(|e| ContractError::malformed_agent(Some(id), e.to_string()))?;
                AgentPayload::TrafficLight { state }
            }
            RawAgentKind::SpeedLimitSign => {
                let limit_mps = raw.speed_limit.ok_or_else(|| missing("speed_limit"))?;
                if !limit_mps.is_finite() || limit_mps < 0.0 {
                    return Err(ContractError::malformed_agent(
                        Some(id),
                        format!("invalid speed limit {limit_mps}"),
                    ));
                }
                AgentPayload::SpeedLimitSign { limit_mps }
            }
            RawAgentKind::Vehicle | RawAgentKind::Pedestrian => {
                return Err(ContractError::malformed_agent(
                    Some(id),
                    "not a traffic-control agent",
                ));
            }
        };

        Ok(Agent {
            id,
            location,
            yaw,
            payload,
        })
    }
}

/// Convert the raw non-player report into traffic-control agents
///
/// Vehicles and pedestrians are dropped. Malformed records are skipped one
/// by one; the rest of the report is still ingested.
pub fn ingest_agents(report: &[RawAgent]) -> Vec<Agent> {
    report
        .iter()
        .filter(|raw| {
            !matches!(
                raw.kind,
                Some(RawAgentKind::Vehicle) | Some(RawAgentKind::Pedestrian)
            )
        })
        .filter_map(|raw| match Agent::try_from(raw) {
            Ok(agent) => Some(agent),
            Err(e) => {
                debug!(error = %e, "Skipping malformed agent record");
                None
            }
        })
        .collect()
}

//! Resolution - Proximity resolver output
//!
//! Which traffic-control agent governs the vehicle this tick, and what it says.

use serde::{Deserialize, Serialize};

use crate::{Agent, AgentPayload, TrafficLightState};

/// Selected agent and its distance to the vehicle
///
/// `distance` is `None` exactly when `selected` is `None`; the fields are
/// private so only the constructors below can build one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProximityResult {
    selected: Option<Agent>,
    distance: Option<f64>,
}

impl ProximityResult {
    /// No governing agent
    pub const fn none() -> Self {
        Self {
            selected: None,
            distance: None,
        }
    }

    /// Agent selected at `distance`
    pub fn at(agent: Agent, distance: f64) -> Self {
        Self {
            selected: Some(agent),
            distance: Some(distance),
        }
    }

    pub fn selected(&self) -> Option<&Agent> {
        self.selected.as_ref()
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn is_none(&self) -> bool {
        self.selected.is_none()
    }
}

/// Value read from the governing agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reading {
    TrafficLight(TrafficLightState),
    /// Speed limit in km/h, `None` when no sign governs
    SpeedLimit(Option<u32>),
}

impl Reading {
    /// Reading carried by an agent
    pub fn of(agent: &Agent) -> Self {
        match agent.payload {
            AgentPayload::TrafficLight { state } => Reading::TrafficLight(state),
            AgentPayload::SpeedLimitSign { limit_mps } => {
                Reading::SpeedLimit(Some(mps_to_kmh(limit_mps)))
            }
        }
    }

    pub fn traffic_light(&self) -> Option<TrafficLightState> {
        match self {
            Reading::TrafficLight(state) => Some(*state),
            Reading::SpeedLimit(_) => None,
        }
    }

    pub fn speed_limit(&self) -> Option<u32> {
        match self {
            Reading::SpeedLimit(limit) => *limit,
            Reading::TrafficLight(_) => None,
        }
    }
}

/// Resolver output for one agent kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub reading: Reading,
    pub proximity: ProximityResult,
}

impl Resolution {
    pub fn new(reading: Reading, proximity: ProximityResult) -> Self {
        Self { reading, proximity }
    }
}

/// Convert m/s to whole km/h (truncating)
pub fn mps_to_kmh(mps: f64) -> u32 {
    (mps * 3.6) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;

    #[test]
    fn test_proximity_result_invariant() {
        let none = ProximityResult::none();
        assert!(none.selected().is_none() && none.distance().is_none());

        let agent = Agent::traffic_light(1, Location::default(), 0.0, TrafficLightState::Red);
        let some = ProximityResult::at(agent, 3.0);
        assert_eq!(some.selected().map(|a| a.id), Some(1));
        assert_eq!(some.distance(), Some(3.0));
    }

    #[test]
    fn test_speed_limit_reading_in_kmh() {
        let sign = Agent::speed_limit_sign(2, Location::default(), 0.0, 25.0);
        assert_eq!(Reading::of(&sign), Reading::SpeedLimit(Some(90)));
    }
}

//! ProximityResolver - 每个 tick 选出对车辆生效的交通控制 agent
//!
//! 流程：半径过滤 → 朝向门控 → 最近距离 → 滞回 (hysteresis)。

use std::collections::HashSet;

use contracts::{
    Agent, AgentKind, KindSettings, Pose, ProximityResult, ProximitySettings, Reading,
    Resolution, TrafficLightState,
};
use tracing::{debug, trace};

use crate::AgentTracker;

/// Per-kind state carried between ticks for hysteresis
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverMemory {
    /// Distance recorded on the last resolved tick; `f64::INFINITY` when unset
    pub last_distance: f64,
    pub last_selected: Option<Agent>,
}

impl ResolverMemory {
    /// Sentinel distance meaning "nothing selected"
    pub const FAR: f64 = f64::INFINITY;

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for ResolverMemory {
    fn default() -> Self {
        Self {
            last_distance: Self::FAR,
            last_selected: None,
        }
    }
}

/// Reading when no index exists for the kind yet
pub fn unobserved_reading(kind: AgentKind) -> Reading {
    match kind {
        AgentKind::TrafficLight => Reading::TrafficLight(TrafficLightState::None),
        AgentKind::SpeedLimitSign => Reading::SpeedLimit(None),
    }
}

/// Reading when agents are known but none governs the vehicle
pub fn clear_reading(kind: AgentKind) -> Reading {
    match kind {
        AgentKind::TrafficLight => Reading::TrafficLight(TrafficLightState::Green),
        AgentKind::SpeedLimitSign => Reading::SpeedLimit(None),
    }
}

/// Whether an agent faces the vehicle
///
/// `yaw_diff = ((car + 180) - (agent + 180) + 180) mod 360 - offset`, floor
/// modulo, accepted on the open interval `(-window, window)`.
pub fn is_valid_orientation(car_yaw: f64, agent_yaw: f64, settings: &KindSettings) -> bool {
    let yaw_diff = yaw_difference(car_yaw, agent_yaw, settings.yaw_offset_deg);
    -settings.yaw_window_deg < yaw_diff && yaw_diff < settings.yaw_window_deg
}

fn yaw_difference(car_yaw: f64, agent_yaw: f64, offset: f64) -> f64 {
    ((car_yaw + 180.0) - (agent_yaw + 180.0) + 180.0).rem_euclid(360.0) - offset
}

/// Resolves the governing agent of each kind
///
/// Owns one [`AgentTracker`] per kind. Every [`ProximityResolver::resolve`]
/// first syncs that kind's tracker with the agents it is given, so index ids
/// and agent data always come from the same tick.
#[derive(Debug)]
pub struct ProximityResolver {
    settings: ProximitySettings,
    lights: AgentTracker,
    signs: AgentTracker,
}

impl ProximityResolver {
    pub fn new(settings: ProximitySettings) -> Self {
        Self {
            settings,
            lights: AgentTracker::new(AgentKind::TrafficLight),
            signs: AgentTracker::new(AgentKind::SpeedLimitSign),
        }
    }

    pub fn settings(&self) -> &ProximitySettings {
        &self.settings
    }

    pub fn tracker(&self, kind: AgentKind) -> &AgentTracker {
        match kind {
            AgentKind::TrafficLight => &self.lights,
            AgentKind::SpeedLimitSign => &self.signs,
        }
    }

    /// Resolve the governing agent of `kind` among this tick's `agents` and
    /// update `memory`
    pub fn resolve(
        &mut self,
        kind: AgentKind,
        agents: &[Agent],
        pose: &Pose,
        memory: &mut ResolverMemory,
    ) -> Resolution {
        match kind {
            AgentKind::TrafficLight => self.lights.observe(agents),
            AgentKind::SpeedLimitSign => self.signs.observe(agents),
        };
        let resolution = self.resolve_inner(kind, agents, pose, memory);
        observability::record_resolution(kind, &resolution);
        resolution
    }

    fn resolve_inner(
        &self,
        kind: AgentKind,
        agents: &[Agent],
        pose: &Pose,
        memory: &mut ResolverMemory,
    ) -> Resolution {
        let settings = self.settings.for_kind(kind);

        let index = match self.tracker(kind).snapshot() {
            Some(index) if !index.is_empty() => index,
            _ => return Resolution::new(unobserved_reading(kind), ProximityResult::none()),
        };

        let in_radius = index.query_radius(&pose.location, settings.radius);
        if in_radius.is_empty() {
            memory.reset();
            return Resolution::new(clear_reading(kind), ProximityResult::none());
        }

        let mut best: Option<(Agent, f64)> = None;
        let mut seen = HashSet::with_capacity(in_radius.len());
        for id in in_radius {
            if !seen.insert(id) {
                continue;
            }
            for agent in agents.iter().filter(|a| a.id == id && a.kind() == kind) {
                let distance = pose.location.distance(&agent.location);
                if distance > settings.radius {
                    continue;
                }
                if !is_valid_orientation(pose.yaw, agent.yaw, settings) {
                    trace!(kind = kind.as_str(), id, yaw = agent.yaw, "Agent misoriented");
                    continue;
                }
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((*agent, distance));
                }
            }
        }

        let Some((candidate, distance)) = best else {
            memory.reset();
            return Resolution::new(clear_reading(kind), ProximityResult::none());
        };

        match memory.last_selected {
            Some(previous) if memory.last_distance <= distance => {
                memory.last_distance = distance;
                Resolution::new(Reading::of(&previous), ProximityResult::at(previous, distance))
            }
            _ => {
                if memory.last_selected.map(|p| p.id) != Some(candidate.id) {
                    debug!(
                        kind = kind.as_str(),
                        id = candidate.id,
                        distance,
                        "Governing agent changed"
                    );
                }
                memory.last_selected = Some(candidate);
                memory.last_distance = distance;
                Resolution::new(Reading::of(&candidate), ProximityResult::at(candidate, distance))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Location;

    /// Agent yaw that puts `yaw_diff` at `diff` for a car heading 0°
    fn facing(diff: f64) -> f64 {
        90.0 - diff
    }

    fn light(id: u32, x: f64, state: TrafficLightState) -> Agent {
        Agent::traffic_light(id, Location::new(x, 0.0, 0.0), facing(0.0), state)
    }

    fn pose() -> Pose {
        Pose {
            location: Location::default(),
            yaw: 0.0,
        }
    }

    fn resolver() -> ProximityResolver {
        ProximityResolver::new(ProximitySettings::default())
    }

    #[test]
    fn test_orientation_gate_open_interval() {
        let settings = KindSettings {
            radius: 12.0,
            yaw_window_deg: 10.0,
            yaw_offset_deg: 90.0,
        };
        assert!(is_valid_orientation(0.0, facing(0.0), &settings));
        assert!(is_valid_orientation(0.0, facing(9.5), &settings));
        assert!(is_valid_orientation(0.0, facing(-9.5), &settings));
        assert!(!is_valid_orientation(0.0, facing(10.0), &settings));
        assert!(!is_valid_orientation(0.0, facing(-10.0), &settings));
        assert!(!is_valid_orientation(0.0, 0.0, &settings));
    }

    #[test]
    fn test_yaw_difference_wraps_with_floor_modulo() {
        assert!(yaw_difference(0.0, 90.0, 90.0).abs() < 1e-9);
        assert!(yaw_difference(350.0, 80.0, 90.0).abs() < 1e-9);
        // negative operand: floor modulo keeps the result in [0, 360)
        assert!(yaw_difference(-170.0, 280.0, 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_unobserved_then_clear_defaults() {
        let mut resolver = resolver();
        let mut memory = ResolverMemory::default();

        let r = resolver.resolve(AgentKind::TrafficLight, &[], &pose(), &mut memory);
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::None));
        assert!(r.proximity.is_none());

        let far = [light(1, 100.0, TrafficLightState::Red)];
        let r = resolver.resolve(AgentKind::TrafficLight, &far, &pose(), &mut memory);
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Green));
        assert!(r.proximity.is_none());

        let r = resolver.resolve(AgentKind::SpeedLimitSign, &far, &pose(), &mut memory);
        assert_eq!(r.reading, Reading::SpeedLimit(None));
    }

    #[test]
    fn test_never_selects_beyond_radius() {
        let mut resolver = resolver();
        for d in [12.01, 12.5, 20.0] {
            let agents = [light(1, d, TrafficLightState::Red)];
            let mut memory = ResolverMemory::default();
            let r = resolver.resolve(AgentKind::TrafficLight, &agents, &pose(), &mut memory);
            assert!(r.proximity.selected().is_none(), "selected at {d}");
        }
    }

    #[test]
    fn test_misoriented_agent_not_reported() {
        let mut resolver = resolver();
        let agents = [Agent::traffic_light(
            1,
            Location::new(3.0, 0.0, 0.0),
            facing(45.0),
            TrafficLightState::Red,
        )];
        let mut memory = ResolverMemory {
            last_distance: 1.0,
            last_selected: Some(agents[0]),
        };
        let r = resolver.resolve(AgentKind::TrafficLight, &agents, &pose(), &mut memory);
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Green));
        assert!(r.proximity.is_none());
        assert_eq!(memory, ResolverMemory::default());
    }

    #[test]
    fn test_nearest_candidate_selected() {
        let mut resolver = resolver();
        let agents = [
            light(1, 8.0, TrafficLightState::Green),
            light(2, 4.0, TrafficLightState::Red),
        ];
        let mut memory = ResolverMemory::default();
        let r = resolver.resolve(AgentKind::TrafficLight, &agents, &pose(), &mut memory);
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Red));
        assert_eq!(r.proximity.distance(), Some(4.0));
        assert_eq!(memory.last_distance, 4.0);
    }

    #[test]
    fn test_hysteresis_keeps_closer_previous_selection() {
        let mut resolver = resolver();
        let mut memory = ResolverMemory::default();

        let first = [light(1, 3.0, TrafficLightState::Red)];
        resolver.resolve(AgentKind::TrafficLight, &first, &pose(), &mut memory);

        // farther candidate does not replace
        let second = [light(2, 4.0, TrafficLightState::Green)];
        let r = resolver.resolve(AgentKind::TrafficLight, &second, &pose(), &mut memory);
        assert_eq!(r.proximity.selected().map(|a| a.id), Some(1));
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Red));
        assert_eq!(r.proximity.distance(), Some(4.0));

        // nearer candidate does
        let third = [light(3, 2.0, TrafficLightState::Yellow)];
        let r = resolver.resolve(AgentKind::TrafficLight, &third, &pose(), &mut memory);
        assert_eq!(r.proximity.selected().map(|a| a.id), Some(3));
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Yellow));
    }

    #[test]
    fn test_two_light_scenario() {
        let mut resolver = resolver();
        let mut memory = ResolverMemory::default();

        let frame1 = [
            light(1, 5.0, TrafficLightState::Red),
            light(2, 5.2, TrafficLightState::Green),
        ];
        let r = resolver.resolve(AgentKind::TrafficLight, &frame1, &pose(), &mut memory);
        assert_eq!(r.proximity.selected().map(|a| a.id), Some(1));
        assert_eq!(r.proximity.distance(), Some(5.0));

        let frame2 = [
            light(1, 5.5, TrafficLightState::Red),
            light(2, 5.2, TrafficLightState::Green),
        ];
        let r = resolver.resolve(AgentKind::TrafficLight, &frame2, &pose(), &mut memory);
        assert_eq!(r.proximity.selected().map(|a| a.id), Some(1));
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Red));
    }

    #[test]
    fn test_index_follows_agents_passed_to_resolve() {
        let mut resolver = resolver();
        let mut memory = ResolverMemory::default();

        let before = [light(1, 5.0, TrafficLightState::Red)];
        let r = resolver.resolve(AgentKind::TrafficLight, &before, &pose(), &mut memory);
        assert_eq!(r.proximity.selected().map(|a| a.id), Some(1));

        // light 1 gone, light 2 appeared nearer
        memory.reset();
        let after = [light(2, 4.0, TrafficLightState::Yellow)];
        let r = resolver.resolve(AgentKind::TrafficLight, &after, &pose(), &mut memory);
        assert_eq!(r.proximity.selected().map(|a| a.id), Some(2));
        assert_eq!(r.reading, Reading::TrafficLight(TrafficLightState::Yellow));
        assert_eq!(resolver.tracker(AgentKind::TrafficLight).rebuild_count(), 2);

        // unchanged composition reuses the index
        resolver.resolve(AgentKind::TrafficLight, &after, &pose(), &mut memory);
        assert_eq!(resolver.tracker(AgentKind::TrafficLight).rebuild_count(), 2);
        assert_eq!(resolver.tracker(AgentKind::SpeedLimitSign).rebuild_count(), 0);
    }

    #[test]
    fn test_speed_limit_reading_in_kmh() {
        let mut resolver = resolver();
        let agents = [Agent::speed_limit_sign(
            5,
            Location::new(6.0, 0.0, 0.0),
            facing(0.0),
            25.0,
        )];
        let mut memory = ResolverMemory::default();
        let r = resolver.resolve(AgentKind::SpeedLimitSign, &agents, &pose(), &mut memory);
        assert_eq!(r.reading, Reading::SpeedLimit(Some(90)));
    }
}

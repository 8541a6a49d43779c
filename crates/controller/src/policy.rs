//! Drive policy blending and a rule-based policy for simulator-free runs

use std::collections::BTreeMap;

use contracts::{
    ContractError, DriveModelSettings, DrivePolicy, ImageData, PolicyInput, PolicyOutput,
    TrafficLightState, VehicleControl,
};

/// Overlay the policy output on `control` according to `settings`
///
/// Brake only overrides when it exceeds `brake_threshold`.
pub fn blend_control(
    mut control: VehicleControl,
    output: &PolicyOutput,
    settings: &DriveModelSettings,
) -> VehicleControl {
    if settings.control_steer {
        control.steer = output.steer;
    }
    if settings.control_throttle {
        control.throttle = output.throttle;
    }
    if settings.control_brake && output.brake > settings.brake_threshold {
        control.brake = output.brake;
    }
    control
}

/// Holds the speed limit and stops for red or yellow lights
///
/// Ignores the images; steering stays straight.
#[derive(Debug, Clone)]
pub struct RuleBasedPolicy {
    /// Speed band (km/h) below the limit where throttle is released
    pub margin_kmh: f64,
    pub cruise_throttle: f64,
    pub stop_brake: f64,
}

impl Default for RuleBasedPolicy {
    fn default() -> Self {
        Self {
            margin_kmh: 2.0,
            cruise_throttle: 0.6,
            stop_brake: 1.0,
        }
    }
}

impl DrivePolicy for RuleBasedPolicy {
    fn predict(
        &mut self,
        _images: &BTreeMap<String, ImageData>,
        input: &PolicyInput,
    ) -> Result<PolicyOutput, ContractError> {
        if !input.speed_kmh.is_finite() {
            return Err(ContractError::policy(format!(
                "non-finite speed {}",
                input.speed_kmh
            )));
        }

        let stop = matches!(
            input.traffic_light,
            TrafficLightState::Red | TrafficLightState::Yellow
        );
        let output = if stop {
            PolicyOutput {
                steer: 0.0,
                throttle: 0.0,
                brake: self.stop_brake,
            }
        } else if input.speed_kmh < f64::from(input.speed_limit) - self.margin_kmh {
            PolicyOutput {
                steer: 0.0,
                throttle: self.cruise_throttle,
                brake: 0.0,
            }
        } else {
            PolicyOutput::default()
        };
        Ok(output)
    }
}

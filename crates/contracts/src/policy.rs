//! DrivePolicy - driving model contract
//!
//! Model internals live outside this workspace; only the prediction
//! contract is fixed here.

use std::collections::BTreeMap;

use crate::{ContractError, HighLevelCommand, ImageData, TrafficLightState};

/// Scalar inputs handed to the policy alongside the camera images
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyInput {
    /// Forward speed (km/h)
    pub speed_kmh: f64,
    /// Speed limit currently in force (km/h)
    pub speed_limit: u32,
    pub traffic_light: TrafficLightState,
    pub hlc: HighLevelCommand,
}

/// Policy output
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolicyOutput {
    pub steer: f64,
    pub throttle: f64,
    pub brake: f64,
}

/// Driving policy
pub trait DrivePolicy: Send {
    /// Predict `(steer, throttle, brake)` for the current frame
    fn predict(
        &mut self,
        images: &BTreeMap<String, ImageData>,
        input: &PolicyInput,
    ) -> Result<PolicyOutput, ContractError>;
}

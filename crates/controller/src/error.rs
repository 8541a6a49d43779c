//! Controller error types

use contracts::ContractError;
use recorder::RecorderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// Recorder rejected a transition or could not be created
    #[error("recorder error: {0}")]
    Recorder(#[from] RecorderError),

    /// Drive policy failed to predict
    #[error("drive policy failed: {0}")]
    Policy(#[source] ContractError),
}

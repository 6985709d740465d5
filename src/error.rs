//! Error types for the execution plan.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The caller broke the `WorkSource` contract, e.g. reported an item twice.
    #[error("Contract violation: {0}")]
    ContractViolation(String),
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Event error: {0}")]
    EventError(String),
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl From<StateMachineError> for PlanError {
    fn from(error: StateMachineError) -> Self {
        PlanError::StateTransitionError(error.to_string())
    }
}

impl From<ConfigurationError> for PlanError {
    fn from(error: ConfigurationError) -> Self {
        PlanError::ConfigurationError(error.to_string())
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(error: serde_json::Error) -> Self {
        PlanError::EventError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PlanError::ContractViolation("item reported twice".to_string());
        assert_eq!(err.to_string(), "Contract violation: item reported twice");

        let err = PlanError::InvalidGraph("unknown item #7".to_string());
        assert_eq!(err.to_string(), "Invalid graph: unknown item #7");
    }

    #[test]
    fn test_state_machine_error_conversion() {
        let sm_err = StateMachineError::InvalidTransition {
            from: Some("succeeded".to_string()),
            to: "Succeed".to_string(),
        };
        let err: PlanError = sm_err.into();
        assert!(matches!(err, PlanError::StateTransitionError(_)));
    }
}

use thiserror::Error;

/// Error types for work item state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: Option<String>, to: String },
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StateMachineError::InvalidTransition {
            from: Some("queued".to_string()),
            to: "Succeed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Some(\"queued\") to \"Succeed\""
        );
    }
}

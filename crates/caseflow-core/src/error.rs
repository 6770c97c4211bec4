use thiserror::Error;

/// Core error type for the Caseflow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Workflow schema not found
    #[error("Workflow schema not found: {0}")]
    SchemaNotFound(String),

    /// Workflow instance not found
    #[error("Workflow instance not found: {0}")]
    InstanceNotFound(String),

    /// Resume targeted an activity that is not the instance's current activity
    #[error("Activity mismatch: instance is waiting on '{current}', not '{requested}'")]
    ActivityMismatch {
        /// The activity the instance is actually waiting on
        current: String,
        /// The activity the caller tried to resume
        requested: String,
    },

    /// No activity implementation registered for a type key
    #[error("Activity type not registered: {0}")]
    ActivityTypeNotRegistered(String),

    /// Schema or definition validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Workflow status transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Persistence gateway error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Orchestration loop exceeded the configured step bound
    #[error("Step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    /// Activity execution error
    #[error("Activity execution error: {0}")]
    ActivityExecutionError(String),

    /// Assignee resolution error
    #[error("Assignment error: {0}")]
    AssignmentError(String),

    /// Guard condition evaluation error
    #[error("Condition evaluation error: {0}")]
    ConditionEvaluationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SerializationError(err.to_string())
    }
}

impl From<String> for EngineError {
    fn from(err: String) -> Self {
        EngineError::Other(err)
    }
}

impl From<&str> for EngineError {
    fn from(err: &str) -> Self {
        EngineError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                EngineError::SchemaNotFound("appraisal-v2".to_string()),
                "Workflow schema not found: appraisal-v2",
            ),
            (
                EngineError::InstanceNotFound("wf-1".to_string()),
                "Workflow instance not found: wf-1",
            ),
            (
                EngineError::ActivityMismatch {
                    current: "review".to_string(),
                    requested: "intake".to_string(),
                },
                "Activity mismatch: instance is waiting on 'review', not 'intake'",
            ),
            (
                EngineError::ActivityTypeNotRegistered("task".to_string()),
                "Activity type not registered: task",
            ),
            (
                EngineError::StepLimitExceeded(250),
                "Step limit of 250 exceeded",
            ),
            (
                EngineError::Other("other_err".to_string()),
                "other_err",
            ),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error: EngineError = json_error.into();

        match error {
            EngineError::SerializationError(msg) => {
                assert!(msg.contains("expected value"));
            }
            _ => panic!("Expected SerializationError variant"),
        }
    }

    #[test]
    fn test_from_str_and_string() {
        let error: EngineError = "boom".into();
        assert_eq!(error, EngineError::Other("boom".to_string()));

        let error: EngineError = String::from("boom").into();
        assert_eq!(error, EngineError::Other("boom".to_string()));
    }

    #[test]
    fn test_error_clone_and_eq() {
        let original = EngineError::ValidationError("dup activity id".to_string());
        let cloned = original.clone();

        assert_eq!(original, cloned);
    }
}

//! Core error types.

use thiserror::Error;

/// Coarse error taxonomy shared with outer layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidDefinition,
    ProtectedOperation,
    Malformed,
}

/// Errors from the state machine engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("state machine not found: {id}")]
    MachineNotFound { id: String },

    #[error("state machine already exists: {id}")]
    MachineExists { id: String },

    #[error("state not found: {state}")]
    StateNotFound { state: String },

    #[error("state already exists: {state}")]
    StateExists { state: String },

    #[error("rule not found: '{from}' -> '{to}'")]
    RuleNotFound { from: String, to: String },

    #[error("rule already exists: '{from}' -> '{to}'")]
    RuleExists { from: String, to: String },

    #[error("invalid state machine definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("cannot delete the default state machine '{id}'")]
    ProtectedMachine { id: String },

    #[error("cannot remove the initial state '{state}'")]
    ProtectedState { state: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidDefinition {
            reason: reason.into(),
        }
    }

    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::MachineNotFound { .. }
            | CoreError::StateNotFound { .. }
            | CoreError::RuleNotFound { .. } => ErrorKind::NotFound,
            CoreError::MachineExists { .. }
            | CoreError::StateExists { .. }
            | CoreError::RuleExists { .. } => ErrorKind::AlreadyExists,
            CoreError::InvalidDefinition { .. } => ErrorKind::InvalidDefinition,
            CoreError::ProtectedMachine { .. } | CoreError::ProtectedState { .. } => {
                ErrorKind::ProtectedOperation
            }
            CoreError::Json(_) => ErrorKind::Malformed,
        }
    }

    /// Returns an error code suitable for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::MachineNotFound { .. } => "MACHINE_NOT_FOUND",
            CoreError::MachineExists { .. } => "MACHINE_EXISTS",
            CoreError::StateNotFound { .. } => "STATE_NOT_FOUND",
            CoreError::StateExists { .. } => "STATE_EXISTS",
            CoreError::RuleNotFound { .. } => "RULE_NOT_FOUND",
            CoreError::RuleExists { .. } => "RULE_EXISTS",
            CoreError::InvalidDefinition { .. } => "INVALID_DEFINITION",
            CoreError::ProtectedMachine { .. } => "PROTECTED_MACHINE",
            CoreError::ProtectedState { .. } => "PROTECTED_STATE",
            CoreError::Json(_) => "BAD_REQUEST",
        }
    }
}

/// Failure raised while evaluating a rule condition.
///
/// These never reach callers of `next_state`; the failing rule is
/// skipped and the error is logged.
#[derive(Debug, Clone, Error)]
pub enum ConditionError {
    #[error("condition failed: {reason}")]
    Failed { reason: String },

    #[error("condition panicked: {message}")]
    Panicked { message: String },
}

impl ConditionError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ConditionError::Failed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = CoreError::MachineNotFound { id: "x".into() };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.error_code(), "MACHINE_NOT_FOUND");

        let err = CoreError::ProtectedState { state: "New".into() };
        assert_eq!(err.kind(), ErrorKind::ProtectedOperation);

        let err = CoreError::invalid("bad");
        assert_eq!(err.kind(), ErrorKind::InvalidDefinition);
        assert_eq!(err.to_string(), "invalid state machine definition: bad");
    }
}

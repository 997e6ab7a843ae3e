//! Workflow Error Types

use thiserror::Error;

use crate::core_types::EntityId;
use crate::persistence::StoreError;

/// Workflow error types
///
/// Error codes are stable strings for API responses and log correlation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no state path named '{0}'")]
    NotFound(String),

    #[error(
        "path '{path}' expects state '{expected}' but entity {entity} is in state '{current}'"
    )]
    IncompatibleState {
        path: String,
        expected: String,
        current: String,
        entity: EntityId,
    },

    #[error("missing required parameter: {key}")]
    MissingParameter { key: String },

    #[error("parameter '{key}' has wrong type (expected {expected})")]
    ParameterType { key: String, expected: &'static str },

    #[error("no action named '{0}' is registered")]
    UnknownAction(String),

    #[error("action '{action}' failed: {message}")]
    Action { action: String, message: String },

    #[error("invariant violation: {0}")]
    Logic(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "PATH_NOT_FOUND",
            WorkflowError::IncompatibleState { .. } => "INCOMPATIBLE_STATE",
            WorkflowError::MissingParameter { .. } => "MISSING_PARAMETER",
            WorkflowError::ParameterType { .. } => "PARAMETER_TYPE",
            WorkflowError::UnknownAction(_) => "UNKNOWN_ACTION",
            WorkflowError::Action { .. } => "ACTION_FAILED",
            WorkflowError::Logic(_) => "LOGIC_ERROR",
            WorkflowError::Store(_) => "STORE_ERROR",
        }
    }
}

//! Settlement Error Types

use thiserror::Error;

use super::crypto::CryptoError;
use crate::accounting::ledger::LedgerError;
use crate::persistence::StoreError;
use crate::workflow::error::WorkflowError;

/// Settlement error types
///
/// Schema and Logic errors abort a whole file before (or instead of) any
/// per-line side effect; everything else is capturable per line.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("malformed batch data: {0}")]
    Schema(String),

    #[error("invariant violation: {0}")]
    Logic(String),

    #[error("no transfer request settles under line '{0}'")]
    RequestNotFound(String),

    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("response line '{line}' failed: {message}")]
    Line { line: String, message: String },
}

impl SettlementError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::Schema(_) => "SCHEMA_ERROR",
            SettlementError::Logic(_) => "LOGIC_ERROR",
            SettlementError::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            SettlementError::Workflow(_) => "WORKFLOW_ERROR",
            SettlementError::Ledger(_) => "LEDGER_ERROR",
            SettlementError::Store(_) => "STORE_ERROR",
            SettlementError::Crypto(_) => "CRYPTO_ERROR",
            SettlementError::Line { .. } => "LINE_FAILED",
        }
    }

    /// Whether this error must abort the whole response file rather than be
    /// captured into a single line's result.
    pub fn aborts_file(&self) -> bool {
        matches!(self, SettlementError::Schema(_) | SettlementError::Logic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SettlementError::Schema("x".into()).code(), "SCHEMA_ERROR");
        assert_eq!(
            SettlementError::RequestNotFound("T1".into()).code(),
            "REQUEST_NOT_FOUND"
        );
    }

    #[test]
    fn test_abort_classification() {
        assert!(SettlementError::Schema("x".into()).aborts_file());
        assert!(SettlementError::Logic("x".into()).aborts_file());
        assert!(!SettlementError::RequestNotFound("T1".into()).aborts_file());
    }
}

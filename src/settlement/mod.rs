//! Funds-Transfer Settlement
//!
//! Aggregates outbound transfer requests into settlement batches for an
//! external credit system and reconciles the per-line responses that come
//! back asynchronously.
//!
//! # Batch Lifecycle
//!
//! ```text
//! PENDING → SUBMITTED → ACCEPTED → RESPONDED
//!               ↓
//!           REJECTED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Per-Line Isolation**: one bad response line never aborts the rest of
//!    the file (unless all-or-nothing mode was requested)
//! 2. **Idempotent Ingestion**: the same batch-message tag is recorded at
//!    most once per request
//! 3. **Posting Iff Succeeded**: only succeeded lines reach the ledger
//! 4. **Fail-Closed Fan-Out**: a collation line that cannot resolve its
//!    member requests is a captured error, never a partial update

pub mod batch;
pub mod crypto;
pub mod error;
pub mod inbound;
#[cfg(feature = "memory-store")]
pub mod memory;
pub mod outbound;
pub mod store;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-exports for convenience
pub use batch::BatchLifecycle;
pub use crypto::BankAccountCipher;
pub use error::SettlementError;
pub use inbound::{
    FundsResponseFile, FundsResponseLine, FundsResponseResult, ReconcileMode, ReconcilePaths,
    ResponseReconciler, ResponseStatus,
};
pub use outbound::{SettlementFile, SettlementFileBuilder, SettlementLine};
pub use store::{EventRecord, SettlementStore};
pub use types::{
    BatchMessage, BatchMessageType, CollationGroup, CreditSystem, FundsTransferBatch,
    FundsTransferEvent, FundsTransferRequest, HydratedBatchMessage, SettlementPosting,
    TransferEventType,
};

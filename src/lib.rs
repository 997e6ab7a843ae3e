//! fundflow - Workflow transitions and funds-transfer settlement
//!
//! Governs controlled transitions of stateful business entities through a
//! finite workflow graph, and layers batch settlement with asynchronous
//! reconciliation on top for funds transfers cleared by an external credit
//! system.
//!
//! # Modules
//!
//! - [`core_types`] - Shared identifier types (entity, batch, event IDs)
//! - [`session`] - Security context with nested access elevation
//! - [`persistence`] - Transaction provider seam and memory reference impl
//! - [`workflow`] - State graph, transition engine, action pipeline
//! - [`accounting`] - Ledger seam and the accounting path action
//! - [`settlement`] - Outbound batch building and inbound reconciliation
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod logging;
pub mod session;

pub mod persistence;

pub mod accounting;
pub mod settlement;
pub mod workflow;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use core_types::{
    BatchId, BatchMessageId, ChangeStamp, EntityId, JournalId, TransferEventId, TransferRequestId,
    TransitionId, UserId,
};
pub use session::{ElevatedScope, Session};

pub use accounting::{AccountingAction, BillingItem, Ledger, LedgerError, LedgerOutcome};
pub use persistence::{
    StoreError, Transaction, TransactionProvider, TxHandle, elevate_transaction_access,
};
pub use settlement::{
    BatchLifecycle, FundsResponseFile, FundsResponseResult, ReconcileMode, ReconcilePaths,
    ResponseReconciler, SettlementError, SettlementFile, SettlementFileBuilder,
};
pub use workflow::{
    ActionArgs, ActionRegistry, PathAction, PathResolver, StateGraphSource, StateTransition,
    Stateful, TransitionEngine, Traversal, WorkflowError,
};

//! Persistence collaborator seams
//!
//! The crate does not own a database. Callers supply a [`TransactionProvider`]
//! and the domain stores behind it; the core only depends on begin/commit
//! semantics and on entity lookups exposed by the store traits in the
//! `workflow` and `settlement` modules.
//!
//! A [`Transaction`] can hold access-elevation guards for its whole lifetime.
//! This matters for backends that defer writes until commit: a lexical
//! elevation scope could close before the deferred writes are actually
//! checked, so transaction-scoped elevation is the required form there.

#[cfg(feature = "memory-store")]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::{ElevatedScope, Session};

/// Errors surfaced by persistence collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Backend transaction handle.
///
/// Implementations must be safe to drop without commit (implicit rollback).
#[async_trait]
pub trait TxHandle: Send {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// One unit of work. Wraps the backend handle and any elevation guards that
/// must stay open until the transaction ends.
pub struct Transaction {
    inner: Box<dyn TxHandle>,
    guards: Vec<ElevatedScope>,
}

impl Transaction {
    pub fn new(inner: Box<dyn TxHandle>) -> Self {
        Self {
            inner,
            guards: Vec::new(),
        }
    }

    /// Keep `guard` open for the remaining lifetime of this transaction.
    /// Released at commit or rollback, whichever comes first.
    pub fn hold_elevation(&mut self, guard: ElevatedScope) {
        self.guards.push(guard);
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        let Transaction { inner, guards } = self;
        let result = inner.commit().await;
        drop(guards);
        result
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        let Transaction { inner, guards } = self;
        let result = inner.rollback().await;
        drop(guards);
        result
    }
}

/// Elevate `session` for the lifetime of `tx`.
///
/// Transaction-scoped counterpart of [`Session::elevated`]; use it when the
/// backend defers writes to commit time.
pub fn elevate_transaction_access(session: &Session, tx: &mut Transaction) {
    tx.hold_elevation(session.elevated());
}

/// Entry point for opening transactions.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn begin(&self) -> Result<Transaction, StoreError>;
}

//! In-memory transaction provider
//!
//! Reference implementation for tests and demos. Writes through the memory
//! stores are applied eagerly, so commit/rollback only track bookkeeping;
//! real backends defer writes to commit and get atomicity from the database.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{StoreError, Transaction, TransactionProvider, TxHandle};

/// Counters shared between the provider and its transactions so tests can
/// assert how a unit of work ended.
#[derive(Debug, Default)]
struct TxCounters {
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    counters: Arc<TxCounters>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begun(&self) -> usize {
        self.counters.begun.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.counters.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> usize {
        self.counters.rolled_back.load(Ordering::SeqCst)
    }
}

struct MemoryTx {
    counters: Arc<TxCounters>,
}

#[async_trait]
impl TxHandle for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.counters.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TransactionProvider for MemoryProvider {
    async fn begin(&self) -> Result<Transaction, StoreError> {
        self.counters.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Transaction::new(Box::new(MemoryTx {
            counters: self.counters.clone(),
        })))
    }
}

//! In-memory settlement store
//!
//! Reference implementation for tests and demos. Writes apply eagerly (the
//! paired [`MemoryProvider`](crate::persistence::memory::MemoryProvider)
//! transactions only track bookkeeping); real backends defer writes to
//! commit and get atomicity from the database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{EventRecord, SettlementStore};
use super::types::{
    BatchMessage, FundsTransferBatch, FundsTransferEvent, FundsTransferRequest,
    HydratedBatchMessage,
};
use crate::core_types::{BatchId, BatchMessageId, TransferRequestId};
use crate::persistence::{StoreError, Transaction};
use crate::workflow::engine::StateTransition;

#[derive(Default)]
struct Inner {
    batches: HashMap<BatchId, FundsTransferBatch>,
    messages: HashMap<BatchMessageId, BatchMessage>,
    requests: HashMap<TransferRequestId, FundsTransferRequest>,
    events: Vec<FundsTransferEvent>,
    transitions: Vec<StateTransition>,
}

#[derive(Default)]
pub struct MemorySettlementStore {
    inner: Mutex<Inner>,
}

impl MemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a request directly (outside any transaction).
    pub fn put_request(&self, request: FundsTransferRequest) {
        self.inner
            .lock()
            .unwrap()
            .requests
            .insert(request.id, request);
    }

    pub fn request(&self, id: TransferRequestId) -> Option<FundsTransferRequest> {
        self.inner.lock().unwrap().requests.get(&id).cloned()
    }

    pub fn events(&self) -> Vec<FundsTransferEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn events_for(&self, request: TransferRequestId) -> Vec<FundsTransferEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.request == request)
            .cloned()
            .collect()
    }

    pub fn transitions(&self) -> Vec<StateTransition> {
        self.inner.lock().unwrap().transitions.clone()
    }
}

#[async_trait]
impl SettlementStore for MemorySettlementStore {
    async fn load_message(
        &self,
        id: BatchMessageId,
    ) -> Result<Option<HydratedBatchMessage>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let Some(message) = inner.messages.get(&id).cloned() else {
            return Ok(None);
        };
        let batch = inner
            .batches
            .get(&message.batch)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("batch {}", message.batch)))?;
        let requests = inner
            .requests
            .values()
            .filter(|r| r.batch == Some(batch.id))
            .cloned()
            .collect();
        Ok(Some(HydratedBatchMessage {
            message,
            batch,
            requests,
        }))
    }

    async fn requests_for_line(
        &self,
        batch: BatchId,
        line_id: &str,
    ) -> Result<Vec<FundsTransferRequest>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .requests
            .values()
            .filter(|r| r.batch == Some(batch) && r.line_id() == line_id)
            .cloned()
            .collect())
    }

    async fn find_event(
        &self,
        request: TransferRequestId,
        batch_message: BatchMessageId,
    ) -> Result<Option<FundsTransferEvent>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .iter()
            .find(|e| e.request == request && e.batch_message == Some(batch_message))
            .cloned())
    }

    async fn record_event(
        &self,
        _tx: &mut Transaction,
        event: FundsTransferEvent,
    ) -> Result<EventRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(tag) = event.batch_message {
            let existing = inner
                .events
                .iter()
                .find(|e| e.request == event.request && e.batch_message == Some(tag))
                .cloned();
            if let Some(existing) = existing {
                return Ok(EventRecord::Duplicate(existing));
            }
        }
        inner.events.push(event.clone());
        Ok(EventRecord::Recorded(event))
    }

    async fn save_batch(
        &self,
        _tx: &mut Transaction,
        batch: &FundsTransferBatch,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .batches
            .insert(batch.id, batch.clone());
        Ok(())
    }

    async fn save_message(
        &self,
        _tx: &mut Transaction,
        message: &BatchMessage,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .insert(message.id, message.clone());
        Ok(())
    }

    async fn save_request(
        &self,
        _tx: &mut Transaction,
        request: &FundsTransferRequest,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .requests
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn save_transition(
        &self,
        _tx: &mut Transaction,
        transition: &StateTransition,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().transitions.push(transition.clone());
        Ok(())
    }
}

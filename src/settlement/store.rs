//! Settlement persistence collaborator
//!
//! Lookup and write seams for batches, requests, events, and transitions.
//! Implementations must eager-load the aggregates a hydrated batch message
//! needs (batch → credit system, message → events → request → group); the
//! core never issues follow-up fetches.

use async_trait::async_trait;

use super::types::{
    BatchMessage, FundsTransferBatch, FundsTransferEvent, FundsTransferRequest,
    HydratedBatchMessage,
};
use crate::core_types::{BatchId, BatchMessageId, TransferRequestId};
use crate::persistence::{StoreError, Transaction};
use crate::workflow::engine::StateTransition;

/// Outcome of an idempotent event insert.
#[derive(Debug, Clone)]
pub enum EventRecord {
    Recorded(FundsTransferEvent),
    /// The same batch-message tag was already recorded for this request;
    /// the stored event is returned and nothing was written.
    Duplicate(FundsTransferEvent),
}

impl EventRecord {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, EventRecord::Duplicate(_))
    }

    pub fn into_event(self) -> FundsTransferEvent {
        match self {
            EventRecord::Recorded(event) | EventRecord::Duplicate(event) => event,
        }
    }
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Hydrated message lookup.
    async fn load_message(
        &self,
        id: BatchMessageId,
    ) -> Result<Option<HydratedBatchMessage>, StoreError>;

    /// Member requests settling under `line_id` within a batch. Returns every
    /// member of a collation group so responses can fan back out.
    async fn requests_for_line(
        &self,
        batch: BatchId,
        line_id: &str,
    ) -> Result<Vec<FundsTransferRequest>, StoreError>;

    /// Stored event for (request, batch message tag), if any.
    async fn find_event(
        &self,
        request: TransferRequestId,
        batch_message: BatchMessageId,
    ) -> Result<Option<FundsTransferEvent>, StoreError>;

    /// Idempotent insert keyed on (request, batch message tag). Events with
    /// no tag are always recorded.
    async fn record_event(
        &self,
        tx: &mut Transaction,
        event: FundsTransferEvent,
    ) -> Result<EventRecord, StoreError>;

    async fn save_batch(
        &self,
        tx: &mut Transaction,
        batch: &FundsTransferBatch,
    ) -> Result<(), StoreError>;

    async fn save_message(
        &self,
        tx: &mut Transaction,
        message: &BatchMessage,
    ) -> Result<(), StoreError>;

    async fn save_request(
        &self,
        tx: &mut Transaction,
        request: &FundsTransferRequest,
    ) -> Result<(), StoreError>;

    async fn save_transition(
        &self,
        tx: &mut Transaction,
        transition: &StateTransition,
    ) -> Result<(), StoreError>;
}

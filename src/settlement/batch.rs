//! Batch lifecycle
//!
//! Assembles queued requests into settlement batches and advances each batch
//! through its checkpoints. Checkpoints accumulate append-only:
//!
//! ```text
//! PENDING → SUBMITTED → ACCEPTED → RESPONDED
//!               ↓
//!           REJECTED
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::error::SettlementError;
use super::store::SettlementStore;
use super::types::{
    BatchMessage, BatchMessageType, CreditSystem, FundsTransferBatch, FundsTransferEvent,
    FundsTransferRequest, HydratedBatchMessage, TransferEventType,
};
use crate::persistence::TransactionProvider;

pub struct BatchLifecycle {
    store: Arc<dyn SettlementStore>,
    provider: Arc<dyn TransactionProvider>,
}

impl BatchLifecycle {
    pub fn new(store: Arc<dyn SettlementStore>, provider: Arc<dyn TransactionProvider>) -> Self {
        Self { store, provider }
    }

    /// Assemble queued requests into a new batch with its Pending checkpoint.
    ///
    /// Each member gets a Queued event tagged with the checkpoint's message
    /// id; everything lands in one transaction.
    pub async fn assemble(
        &self,
        name: &str,
        credit_system: CreditSystem,
        requests: &[FundsTransferRequest],
    ) -> Result<HydratedBatchMessage, SettlementError> {
        let batch = FundsTransferBatch {
            id: Uuid::new_v4(),
            name: name.to_string(),
            date: Utc::now(),
            credit_system,
        };
        let mut message = BatchMessage {
            id: Uuid::new_v4(),
            batch: batch.id,
            message_type: BatchMessageType::Pending,
            created_at: Utc::now(),
            events: Vec::new(),
        };

        let mut tx = self.provider.begin().await?;
        self.store.save_batch(&mut tx, &batch).await?;

        let mut members = Vec::with_capacity(requests.len());
        for request in requests {
            let mut request = request.clone();
            request.batch = Some(batch.id);

            let event = FundsTransferEvent::new(request.id, TransferEventType::Queued)
                .with_batch_message(message.id);
            let record = self.store.record_event(&mut tx, event).await?;
            message.events.push(record.into_event().id);

            self.store.save_request(&mut tx, &request).await?;
            members.push(request);
        }

        self.store.save_message(&mut tx, &message).await?;
        tx.commit().await?;

        info!(batch = %batch.id, requests = members.len(), "batch assembled");
        Ok(HydratedBatchMessage {
            message,
            batch,
            requests: members,
        })
    }

    /// Append the next lifecycle checkpoint to `current`'s batch.
    ///
    /// A Rejected checkpoint records a Failed event per member request; the
    /// other checkpoints only mark progress.
    pub async fn advance(
        &self,
        current: &HydratedBatchMessage,
        to: BatchMessageType,
    ) -> Result<BatchMessage, SettlementError> {
        if !to.may_follow(current.message.message_type) {
            return Err(SettlementError::Logic(format!(
                "batch checkpoint {} cannot follow {}",
                to, current.message.message_type
            )));
        }

        let mut checkpoint = BatchMessage {
            id: Uuid::new_v4(),
            batch: current.batch.id,
            message_type: to,
            created_at: Utc::now(),
            events: Vec::new(),
        };

        let mut tx = self.provider.begin().await?;
        if to == BatchMessageType::Rejected {
            for request in &current.requests {
                let event = FundsTransferEvent::new(request.id, TransferEventType::Failed)
                    .with_batch_message(checkpoint.id);
                let record = self.store.record_event(&mut tx, event).await?;
                checkpoint.events.push(record.into_event().id);
            }
        }
        self.store.save_message(&mut tx, &checkpoint).await?;
        tx.commit().await?;

        info!(batch = %current.batch.id, checkpoint = %to, "batch advanced");
        Ok(checkpoint)
    }

    pub async fn mark_submitted(
        &self,
        current: &HydratedBatchMessage,
    ) -> Result<BatchMessage, SettlementError> {
        self.advance(current, BatchMessageType::Submitted).await
    }

    pub async fn mark_accepted(
        &self,
        current: &HydratedBatchMessage,
    ) -> Result<BatchMessage, SettlementError> {
        self.advance(current, BatchMessageType::Accepted).await
    }

    pub async fn mark_rejected(
        &self,
        current: &HydratedBatchMessage,
    ) -> Result<BatchMessage, SettlementError> {
        self.advance(current, BatchMessageType::Rejected).await
    }

    pub async fn mark_responded(
        &self,
        current: &HydratedBatchMessage,
    ) -> Result<BatchMessage, SettlementError> {
        self.advance(current, BatchMessageType::Responded).await
    }
}

//! Funds Transfer Core Types
//!
//! Domain records for outbound settlement batches and inbound reconciliation.
//! Requests are themselves workflow-governed: the reconciler drives their
//! state transitions as responses arrive.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounting::ledger::BillingItem;
use crate::core_types::{
    BatchId, BatchMessageId, ChangeStamp, EntityId, TransferEventId, TransferRequestId,
    TransitionId,
};
use crate::workflow::engine::Stateful;
use crate::workflow::graph::State;

/// External clearing system a batch settles through.
#[derive(Debug, Clone)]
pub struct CreditSystem {
    pub id: u32,
    /// `None` on a malformed or incompletely loaded batch; the outbound
    /// builder rejects such batches before emitting anything.
    pub code_name: Option<String>,
}

/// Grouping identifier correlating requests that settle as one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationGroup {
    pub id: uuid::Uuid,
    /// Line identifier the group settles under.
    pub code: String,
}

/// Encrypted-at-rest bank account descriptor. Opaque to this crate; only the
/// cipher collaborator can read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBankAccount(pub String);

/// Decrypted descriptor as it appears on a settlement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub holder_name: String,
    pub account_number: String,
    pub routing_number: String,
}

/// One outbound transfer intent.
#[derive(Debug, Clone)]
pub struct FundsTransferRequest {
    pub id: TransferRequestId,
    pub entity_id: EntityId,
    /// External transaction identifier; the line identifier when ungrouped.
    pub transaction_id: String,
    /// Signed: positive = deposit, negative = withdrawal.
    pub amount: Decimal,
    pub account: EncryptedBankAccount,
    pub group: Option<CollationGroup>,
    pub batch: Option<BatchId>,

    // Workflow attributes, mutated only through the transition engine.
    pub state: Arc<State>,
    pub change_stamp: ChangeStamp,
    pub last_state_change: Option<DateTime<Utc>>,
    pub last_state_group_change: Option<DateTime<Utc>>,
}

impl FundsTransferRequest {
    pub fn new(
        entity_id: EntityId,
        transaction_id: &str,
        amount: Decimal,
        account: EncryptedBankAccount,
        state: Arc<State>,
    ) -> Self {
        Self {
            id: TransferRequestId::new(),
            entity_id,
            transaction_id: transaction_id.to_string(),
            amount,
            account,
            group: None,
            batch: None,
            state,
            change_stamp: 0,
            last_state_change: None,
            last_state_group_change: None,
        }
    }

    /// Line identifier this request settles under: its group's code, or its
    /// own transaction id when ungrouped.
    pub fn line_id(&self) -> &str {
        self.group
            .as_ref()
            .map(|g| g.code.as_str())
            .unwrap_or(&self.transaction_id)
    }
}

impl Stateful for FundsTransferRequest {
    fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    fn state(&self) -> &Arc<State> {
        &self.state
    }

    fn set_state(&mut self, state: Arc<State>) {
        self.state = state;
    }

    fn change_stamp(&self) -> ChangeStamp {
        self.change_stamp
    }

    fn set_change_stamp(&mut self, stamp: ChangeStamp) {
        self.change_stamp = stamp;
    }

    fn last_state_change(&self) -> Option<DateTime<Utc>> {
        self.last_state_change
    }

    fn set_last_state_change(&mut self, at: Option<DateTime<Utc>>) {
        self.last_state_change = at;
    }

    fn last_state_group_change(&self) -> Option<DateTime<Utc>> {
        self.last_state_group_change
    }

    fn set_last_state_group_change(&mut self, at: Option<DateTime<Utc>>) {
        self.last_state_group_change = at;
    }
}

/// A named, dated collection of requests destined for one credit system.
#[derive(Debug, Clone)]
pub struct FundsTransferBatch {
    pub id: BatchId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub credit_system: CreditSystem,
}

/// Batch lifecycle checkpoint kind
///
/// Checkpoints accumulate append-only as the batch progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum BatchMessageType {
    Pending = 1,
    Submitted = 2,
    Accepted = 3,
    Rejected = 4,
    Responded = 5,
}

impl BatchMessageType {
    /// Get the numeric type ID for storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(BatchMessageType::Pending),
            2 => Some(BatchMessageType::Submitted),
            3 => Some(BatchMessageType::Accepted),
            4 => Some(BatchMessageType::Rejected),
            5 => Some(BatchMessageType::Responded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMessageType::Pending => "PENDING",
            BatchMessageType::Submitted => "SUBMITTED",
            BatchMessageType::Accepted => "ACCEPTED",
            BatchMessageType::Rejected => "REJECTED",
            BatchMessageType::Responded => "RESPONDED",
        }
    }

    /// Legal checkpoint order:
    /// Pending → Submitted → (Accepted | Rejected) → Responded.
    pub fn may_follow(&self, previous: BatchMessageType) -> bool {
        matches!(
            (previous, self),
            (BatchMessageType::Pending, BatchMessageType::Submitted)
                | (BatchMessageType::Submitted, BatchMessageType::Accepted)
                | (BatchMessageType::Submitted, BatchMessageType::Rejected)
                | (BatchMessageType::Accepted, BatchMessageType::Responded)
        )
    }
}

impl fmt::Display for BatchMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One lifecycle checkpoint of a batch.
#[derive(Debug, Clone)]
pub struct BatchMessage {
    pub id: BatchMessageId,
    pub batch: BatchId,
    pub message_type: BatchMessageType,
    pub created_at: DateTime<Utc>,
    /// Events produced at this checkpoint.
    pub events: Vec<TransferEventId>,
}

/// Transfer event kind
///
/// Negative IDs are the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TransferEventType {
    Queued = 1,
    Accepted = 2,
    Succeeded = 3,
    Failed = -1,
    /// Failure class, retaining the original Returned status for reporting.
    Returned = -2,
    /// Failure class, retaining the original NoticeOfChange status.
    ChangeNotice = -3,
}

impl TransferEventType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TransferEventType::Queued),
            2 => Some(TransferEventType::Accepted),
            3 => Some(TransferEventType::Succeeded),
            -1 => Some(TransferEventType::Failed),
            -2 => Some(TransferEventType::Returned),
            -3 => Some(TransferEventType::ChangeNotice),
            _ => None,
        }
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        self.id() < 0
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEventType::Queued => "QUEUED",
            TransferEventType::Accepted => "ACCEPTED",
            TransferEventType::Succeeded => "SUCCEEDED",
            TransferEventType::Failed => "FAILED",
            TransferEventType::Returned => "RETURNED",
            TransferEventType::ChangeNotice => "CHANGE_NOTICE",
        }
    }
}

impl fmt::Display for TransferEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timestamped status record for one request. Created exactly once per
/// traversal or response line, never updated.
#[derive(Debug, Clone)]
pub struct FundsTransferEvent {
    pub id: TransferEventId,
    pub request: TransferRequestId,
    pub event_type: TransferEventType,
    pub created_at: DateTime<Utc>,
    /// Originating batch message; the idempotency tag for inbound ingestion.
    pub batch_message: Option<BatchMessageId>,
    /// Transition that caused or accompanied this event.
    pub transition: Option<TransitionId>,
    pub response_code: Option<String>,
    pub trace_code: Option<String>,
    pub comments: Option<String>,
}

impl FundsTransferEvent {
    pub fn new(request: TransferRequestId, event_type: TransferEventType) -> Self {
        Self {
            id: TransferEventId::new(),
            request,
            event_type,
            created_at: Utc::now(),
            batch_message: None,
            transition: None,
            response_code: None,
            trace_code: None,
            comments: None,
        }
    }

    pub fn with_batch_message(mut self, id: BatchMessageId) -> Self {
        self.batch_message = Some(id);
        self
    }

    pub fn with_transition(mut self, id: TransitionId) -> Self {
        self.transition = Some(id);
        self
    }
}

/// A batch message with its batch, credit system, and member requests
/// eager-loaded. The fetch strategy is the store's concern; the core only
/// consumes the hydrated value.
#[derive(Debug, Clone)]
pub struct HydratedBatchMessage {
    pub message: BatchMessage,
    pub batch: FundsTransferBatch,
    pub requests: Vec<FundsTransferRequest>,
}

/// Billing item posted to the ledger when a settlement line succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPosting {
    pub request_id: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub batch_message: BatchMessageId,
}

impl BillingItem for SettlementPosting {
    const KEY: &'static str = "settlement_posting";
}

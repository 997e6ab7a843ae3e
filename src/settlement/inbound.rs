//! Inbound response reconciliation
//!
//! Consumes the external credit system's per-line settlement responses and
//! folds them back into the workflow engine and the accounting ledger. Lines
//! are processed independently: one bad line is captured into its result and
//! never aborts the rest of the file. Only malformed files and unrecognized
//! statuses are fatal to the whole file.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::SettlementError;
use super::store::SettlementStore;
use super::types::{
    FundsTransferEvent, FundsTransferRequest, HydratedBatchMessage, SettlementPosting,
    TransferEventType,
};
use crate::accounting::action::AccountingAction;
use crate::core_types::BatchMessageId;
use crate::persistence::{Transaction, TransactionProvider};
use crate::session::Session;
use crate::workflow::engine::TransitionEngine;
use crate::workflow::store::PathResolver;

/// Enumerated status set a response line may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Rejected,
    Accepted,
    Failed,
    Succeeded,
    Returned,
    NoticeOfChange,
}

/// The reconciler's status mapping table. A wire status missing from this
/// table is a configuration defect, not per-line data noise.
static STATUS_TABLE: Lazy<HashMap<&'static str, ResponseStatus>> = Lazy::new(|| {
    HashMap::from([
        ("Rejected", ResponseStatus::Rejected),
        ("Accepted", ResponseStatus::Accepted),
        ("Failed", ResponseStatus::Failed),
        ("Succeeded", ResponseStatus::Succeeded),
        ("Returned", ResponseStatus::Returned),
        ("NoticeOfChange", ResponseStatus::NoticeOfChange),
    ])
});

impl ResponseStatus {
    /// Strict parse of the wire status against the mapping table.
    pub fn parse(code: &str) -> Option<Self> {
        STATUS_TABLE.get(code).copied()
    }

    /// Internal event type this status maps to. Returned and NoticeOfChange
    /// land in the failure class but keep their own variants for reporting.
    pub fn event_type(self) -> TransferEventType {
        match self {
            ResponseStatus::Rejected => TransferEventType::Failed,
            ResponseStatus::Accepted => TransferEventType::Accepted,
            ResponseStatus::Failed => TransferEventType::Failed,
            ResponseStatus::Succeeded => TransferEventType::Succeeded,
            ResponseStatus::Returned => TransferEventType::Returned,
            ResponseStatus::NoticeOfChange => TransferEventType::ChangeNotice,
        }
    }
}

/// One parsed inbound reconciliation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundsResponseLine {
    /// The original line/transaction identifier from the outbound file.
    pub transaction_id: String,
    /// Wire status code; mapped strictly at reconcile time.
    pub status: String,
    #[serde(default)]
    pub response_code: Option<String>,
    #[serde(default)]
    pub trace_code: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Root of the inbound response file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundsResponseFile {
    /// The batch message this file responds to.
    pub batch_message: BatchMessageId,
    pub lines: Vec<FundsResponseLine>,
}

impl FundsResponseFile {
    /// Parse the wire form. Missing required linkage is a schema error,
    /// rejected before any line is looked at.
    pub fn from_json(raw: &str) -> Result<Self, SettlementError> {
        serde_json::from_str(raw).map_err(|e| SettlementError::Schema(e.to_string()))
    }
}

/// Per-line outcome: the events fanned out to member requests, the source
/// line, and a captured failure if processing that line faulted.
#[derive(Debug)]
pub struct FundsResponseResult {
    pub line: FundsResponseLine,
    pub events: Vec<FundsTransferEvent>,
    pub error: Option<SettlementError>,
}

impl FundsResponseResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// How line failures relate to the rest of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileMode {
    /// One transaction per line; a failed line is captured and the rest
    /// proceed.
    #[default]
    PerLine,
    /// One transaction for the whole file; the first failed line aborts it.
    AllOrNothing,
}

/// Workflow paths the reconciler drives per mapped event type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilePaths {
    #[serde(default)]
    pub on_accepted: Option<String>,
    #[serde(default)]
    pub on_succeeded: Option<String>,
    #[serde(default)]
    pub on_failed: Option<String>,
}

impl ReconcilePaths {
    fn for_event(&self, event_type: TransferEventType) -> Option<&str> {
        match event_type {
            TransferEventType::Accepted => self.on_accepted.as_deref(),
            TransferEventType::Succeeded => self.on_succeeded.as_deref(),
            TransferEventType::Failed
            | TransferEventType::Returned
            | TransferEventType::ChangeNotice => self.on_failed.as_deref(),
            TransferEventType::Queued => None,
        }
    }
}

/// Reconciles one response file back into requests, events, transitions,
/// and - for succeeded lines - the accounting ledger.
pub struct ResponseReconciler {
    store: Arc<dyn SettlementStore>,
    provider: Arc<dyn TransactionProvider>,
    resolver: Arc<PathResolver>,
    accounting: Arc<AccountingAction<SettlementPosting>>,
    paths: ReconcilePaths,
    mode: ReconcileMode,
}

impl ResponseReconciler {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        provider: Arc<dyn TransactionProvider>,
        resolver: Arc<PathResolver>,
        accounting: Arc<AccountingAction<SettlementPosting>>,
        paths: ReconcilePaths,
        mode: ReconcileMode,
    ) -> Self {
        Self {
            store,
            provider,
            resolver,
            accounting,
            paths,
            mode,
        }
    }

    /// Process every line of `file`, returning one result per line in file
    /// order. The caller decides how to treat partial failure.
    pub async fn reconcile(
        &self,
        session: &Session,
        file: &FundsResponseFile,
    ) -> Result<Vec<FundsResponseResult>, SettlementError> {
        // File-level validation before any side effect.
        let message = self
            .store
            .load_message(file.batch_message)
            .await?
            .ok_or_else(|| {
                SettlementError::Schema(format!(
                    "response file references unknown batch message {}",
                    file.batch_message
                ))
            })?;

        // Strict status mapping up front: an out-of-date table must abort
        // the file, not poison individual lines.
        let mut mapped = Vec::with_capacity(file.lines.len());
        for line in &file.lines {
            let status = ResponseStatus::parse(&line.status).ok_or_else(|| {
                SettlementError::Logic(format!(
                    "unrecognized response status '{}' on line '{}'",
                    line.status, line.transaction_id
                ))
            })?;
            mapped.push((line, status));
        }

        info!(
            batch_message = %file.batch_message,
            lines = mapped.len(),
            mode = ?self.mode,
            "reconciling response file"
        );

        match self.mode {
            ReconcileMode::PerLine => self.reconcile_per_line(session, &message, &mapped).await,
            ReconcileMode::AllOrNothing => {
                self.reconcile_all_or_nothing(session, &message, &mapped)
                    .await
            }
        }
    }

    async fn reconcile_per_line(
        &self,
        session: &Session,
        message: &HydratedBatchMessage,
        mapped: &[(&FundsResponseLine, ResponseStatus)],
    ) -> Result<Vec<FundsResponseResult>, SettlementError> {
        let mut results = Vec::with_capacity(mapped.len());

        for &(line, status) in mapped {
            let mut tx = self.provider.begin().await?;
            let outcome = match self
                .process_line(session, &mut tx, message, line, status)
                .await
            {
                Ok(events) => tx.commit().await.map(|_| events).map_err(Into::into),
                Err(err) => {
                    if let Err(rb) = tx.rollback().await {
                        warn!(line = %line.transaction_id, error = %rb, "line rollback failed");
                    }
                    Err(err)
                }
            };

            results.push(match outcome {
                Ok(events) => FundsResponseResult {
                    line: line.clone(),
                    events,
                    error: None,
                },
                Err(err) => {
                    warn!(line = %line.transaction_id, error = %err, "response line failed");
                    FundsResponseResult {
                        line: line.clone(),
                        events: Vec::new(),
                        error: Some(err),
                    }
                }
            });
        }

        Ok(results)
    }

    async fn reconcile_all_or_nothing(
        &self,
        session: &Session,
        message: &HydratedBatchMessage,
        mapped: &[(&FundsResponseLine, ResponseStatus)],
    ) -> Result<Vec<FundsResponseResult>, SettlementError> {
        let mut tx = self.provider.begin().await?;
        let mut results = Vec::with_capacity(mapped.len());

        for &(line, status) in mapped {
            match self
                .process_line(session, &mut tx, message, line, status)
                .await
            {
                Ok(events) => results.push(FundsResponseResult {
                    line: line.clone(),
                    events,
                    error: None,
                }),
                Err(err) => {
                    if let Err(rb) = tx.rollback().await {
                        warn!(error = %rb, "file rollback failed");
                    }
                    return Err(SettlementError::Line {
                        line: line.transaction_id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(results)
    }

    /// One line's side effects: idempotent event per member request, the
    /// configured workflow transition, and the ledger posting when the line
    /// succeeded.
    async fn process_line(
        &self,
        session: &Session,
        tx: &mut Transaction,
        message: &HydratedBatchMessage,
        line: &FundsResponseLine,
        status: ResponseStatus,
    ) -> Result<Vec<FundsTransferEvent>, SettlementError> {
        let event_type = status.event_type();
        let requests = self
            .store
            .requests_for_line(message.batch.id, &line.transaction_id)
            .await?;
        if requests.is_empty() {
            return Err(SettlementError::RequestNotFound(line.transaction_id.clone()));
        }

        let mut events = Vec::with_capacity(requests.len());
        for request in requests {
            events.push(
                self.process_member(session, tx, message, line, event_type, request)
                    .await?,
            );
        }
        Ok(events)
    }

    async fn process_member(
        &self,
        session: &Session,
        tx: &mut Transaction,
        message: &HydratedBatchMessage,
        line: &FundsResponseLine,
        event_type: TransferEventType,
        mut request: FundsTransferRequest,
    ) -> Result<FundsTransferEvent, SettlementError> {
        // Idempotent ingestion: the same batch message already recorded for
        // this request means the line was processed before - a no-op.
        if let Some(existing) = self.store.find_event(request.id, message.message.id).await? {
            debug!(
                request = %request.id,
                batch_message = %message.message.id,
                "event already recorded, skipping"
            );
            return Ok(existing);
        }

        let mut event = FundsTransferEvent::new(request.id, event_type)
            .with_batch_message(message.message.id);
        event.response_code = line.response_code.clone();
        event.trace_code = line.trace_code.clone();
        event.comments = line.comments.clone();

        // Drive the configured workflow path for this outcome.
        if let Some(code_name) = self.paths.for_event(event_type) {
            let path = self.resolver.resolve(code_name).await?;
            let mut transition = TransitionEngine::follow_path(&mut request, &path)?;
            transition.funds_transfer_event = Some(event.id);
            event.transition = Some(transition.id);
            self.store.save_transition(tx, &transition).await?;
            self.store.save_request(tx, &request).await?;
        }

        let record = self.store.record_event(tx, event).await?;
        if record.is_duplicate() {
            // Raced with a concurrent ingestion of the same file.
            return Ok(record.into_event());
        }
        let event = record.into_event();

        // A posting happens iff the settlement succeeded; every other
        // status only records the tracking event.
        if event_type == TransferEventType::Succeeded {
            let posting = SettlementPosting {
                request_id: request.id.to_string(),
                transaction_id: line.transaction_id.clone(),
                amount: request.amount,
                batch_message: message.message.id,
            };
            self.accounting.append_journal(session, tx, &posting).await?;
        }

        Ok(event)
    }
}

//! Integration Tests for Settlement
//!
//! These tests verify the full outbound/inbound flow without a live
//! database, using the memory stores and the recording ledger.

use std::sync::Arc;

use crate::accounting::action::AccountingAction;
use crate::accounting::ledger::recording::RecordingLedger;
use crate::persistence::memory::MemoryProvider;
use crate::session::Session;
use crate::settlement::batch::BatchLifecycle;
use crate::settlement::crypto::{BankAccountCipher, Base64Cipher};
use crate::settlement::inbound::{
    FundsResponseFile, FundsResponseLine, ReconcileMode, ReconcilePaths, ResponseReconciler,
};
use crate::settlement::memory::MemorySettlementStore;
use crate::settlement::outbound::SettlementFileBuilder;
use crate::settlement::types::{
    BankAccount, BatchMessageType, CollationGroup, CreditSystem, EncryptedBankAccount,
    FundsTransferRequest, HydratedBatchMessage, SettlementPosting, TransferEventType,
};
use crate::workflow::graph::{State, fixtures};
use crate::workflow::store::PathResolver;
use crate::workflow::store::memory::MemoryGraphSource;

/// Everything one settlement round needs, wired against memory stores.
struct TestHarness {
    store: Arc<MemorySettlementStore>,
    provider: Arc<MemoryProvider>,
    ledger: Arc<RecordingLedger<SettlementPosting>>,
    lifecycle: BatchLifecycle,
    builder: SettlementFileBuilder,
    reconciler: ResponseReconciler,
    queued: Arc<State>,
}

impl TestHarness {
    fn new(mode: ReconcileMode) -> Self {
        let graph = fixtures::graph();
        let open = fixtures::group(1, "open", &graph);
        let closed = fixtures::group(2, "closed", &graph);
        let queued = fixtures::state(1, "queued", &open);
        let settled = fixtures::state(2, "settled", &closed);
        let failed = fixtures::state(3, "failed", &closed);

        let source = Arc::new(MemoryGraphSource::new());
        source.insert(fixtures::path("settle-succeeded", &queued, &settled, !0, 0x02));
        source.insert(fixtures::path("settle-failed", &queued, &failed, !0, 0x04));
        let resolver = Arc::new(PathResolver::new(source));

        let store = Arc::new(MemorySettlementStore::new());
        let provider = Arc::new(MemoryProvider::new());
        let ledger: Arc<RecordingLedger<SettlementPosting>> = Arc::new(RecordingLedger::new());
        let accounting: Arc<AccountingAction<SettlementPosting>> = Arc::new(
            AccountingAction::new("append-settlement", ledger.clone(), provider.clone()),
        );

        let paths = ReconcilePaths {
            on_accepted: None,
            on_succeeded: Some("settle-succeeded".into()),
            on_failed: Some("settle-failed".into()),
        };

        Self {
            lifecycle: BatchLifecycle::new(store.clone(), provider.clone()),
            builder: SettlementFileBuilder::new(Arc::new(Base64Cipher)),
            reconciler: ResponseReconciler::new(
                store.clone(),
                provider.clone(),
                resolver,
                accounting,
                paths,
                mode,
            ),
            store,
            provider,
            ledger,
            queued,
        }
    }

    fn account(&self) -> EncryptedBankAccount {
        Base64Cipher
            .encrypt(&BankAccount {
                holder_name: "Ada Lovelace".into(),
                account_number: "000123456".into(),
                routing_number: "110000000".into(),
            })
            .unwrap()
    }

    fn request(&self, entity: u64, txn: &str, amount: &str) -> FundsTransferRequest {
        FundsTransferRequest::new(
            entity,
            txn,
            amount.parse().unwrap(),
            self.account(),
            self.queued.clone(),
        )
    }

    /// Assemble a batch, mark it submitted, and return the hydrated
    /// submitted checkpoint (the one responses reference).
    async fn submitted_batch(&self, requests: Vec<FundsTransferRequest>) -> HydratedBatchMessage {
        let pending = self
            .lifecycle
            .assemble(
                "2026-08-06-a",
                CreditSystem {
                    id: 1,
                    code_name: Some("ach-east".into()),
                },
                &requests,
            )
            .await
            .unwrap();
        let submitted = self.lifecycle.mark_submitted(&pending).await.unwrap();
        HydratedBatchMessage {
            message: submitted,
            batch: pending.batch,
            requests: pending.requests,
        }
    }

    fn line(txn: &str, status: &str) -> FundsResponseLine {
        FundsResponseLine {
            transaction_id: txn.into(),
            status: status.into(),
            response_code: None,
            trace_code: None,
            comments: None,
        }
    }
}

// ============================================================================
// Outbound + lifecycle
// ============================================================================

#[tokio::test]
async fn test_assemble_records_queued_events() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let requests = vec![h.request(1, "T1", "5.00"), h.request(2, "T2", "6.00")];

    let pending = h.submitted_batch(requests).await;

    for request in &pending.requests {
        let events = h.store.events_for(request.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, TransferEventType::Queued);
        assert_eq!(request.batch, Some(pending.batch.id));
    }
}

#[tokio::test]
async fn test_illegal_checkpoint_order() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let pending = h
        .lifecycle
        .assemble(
            "b",
            CreditSystem {
                id: 1,
                code_name: Some("ach-east".into()),
            },
            &[h.request(1, "T1", "5.00")],
        )
        .await
        .unwrap();

    // Pending cannot jump straight to Responded
    let err = h.lifecycle.mark_responded(&pending).await.unwrap_err();
    assert_eq!(err.code(), "LOGIC_ERROR");
}

#[tokio::test]
async fn test_rejected_batch_fails_every_member() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let submitted = h
        .submitted_batch(vec![h.request(1, "T1", "5.00"), h.request(2, "T2", "6.00")])
        .await;

    let rejected = h.lifecycle.mark_rejected(&submitted).await.unwrap();

    assert_eq!(rejected.message_type, BatchMessageType::Rejected);
    assert_eq!(rejected.events.len(), 2);
    for request in &submitted.requests {
        let failed: Vec<_> = h
            .store
            .events_for(request.id)
            .into_iter()
            .filter(|e| e.event_type == TransferEventType::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
    }
}

// ============================================================================
// Aggregation round-trip
// ============================================================================

#[tokio::test]
async fn test_collation_round_trip() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let group = CollationGroup {
        id: uuid::Uuid::new_v4(),
        code: "G1".into(),
    };
    let mut a = h.request(1, "T1", "30.00");
    let mut b = h.request(2, "T2", "70.00");
    a.group = Some(group.clone());
    b.group = Some(group);

    let pending = h
        .lifecycle
        .assemble(
            "b",
            CreditSystem {
                id: 1,
                code_name: Some("ach-east".into()),
            },
            &[a, b],
        )
        .await
        .unwrap();

    // Outbound: one line with the summed amount under the group's code.
    let file = h.builder.build(&pending).unwrap();
    assert_eq!(file.lines.len(), 1);
    assert_eq!(file.lines[0].line_id, "G1");
    assert_eq!(file.lines[0].amount.to_string(), "100.00");

    // Inbound: the response for that line fans back out to both members.
    let submitted = h.lifecycle.mark_submitted(&pending).await.unwrap();
    let response = FundsResponseFile {
        batch_message: submitted.id,
        lines: vec![TestHarness::line("G1", "Succeeded")],
    };

    let session = Session::new(1);
    let results = h.reconciler.reconcile(&session, &response).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
    assert_eq!(results[0].events.len(), 2);

    for request in &pending.requests {
        let stored = h.store.request(request.id).unwrap();
        assert_eq!(stored.state.code_name, "settled");
    }

    // One posting per member, carrying the member's own amount.
    let amounts: Vec<String> = h
        .ledger
        .postings()
        .iter()
        .map(|p| p.amount.to_string())
        .collect();
    assert_eq!(amounts.len(), 2);
    assert!(amounts.contains(&"30.00".to_string()));
    assert!(amounts.contains(&"70.00".to_string()));
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_posting_iff_succeeded() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let statuses = [
        ("T1", "Rejected"),
        ("T2", "Accepted"),
        ("T3", "Failed"),
        ("T4", "Succeeded"),
        ("T5", "Returned"),
        ("T6", "NoticeOfChange"),
    ];
    let requests: Vec<_> = statuses
        .iter()
        .enumerate()
        .map(|(i, (txn, _))| h.request(i as u64 + 1, txn, "10.00"))
        .collect();
    let submitted = h.submitted_batch(requests).await;

    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: statuses
            .iter()
            .map(|(txn, status)| TestHarness::line(txn, status))
            .collect(),
    };

    let session = Session::new(1);
    let results = h.reconciler.reconcile(&session, &response).await.unwrap();

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.is_ok()));
    // Exactly one journal-append: the Succeeded line.
    assert_eq!(h.ledger.posting_count(), 1);
    assert_eq!(h.ledger.postings()[0].transaction_id, "T4");

    let expectations = [
        ("T1", TransferEventType::Failed, "failed"),
        ("T3", TransferEventType::Failed, "failed"),
        ("T4", TransferEventType::Succeeded, "settled"),
        ("T5", TransferEventType::Returned, "failed"),
        ("T6", TransferEventType::ChangeNotice, "failed"),
    ];
    for (txn, event_type, end_state) in expectations {
        let request = submitted
            .requests
            .iter()
            .find(|r| r.transaction_id == txn)
            .unwrap();
        let events: Vec<_> = h
            .store
            .events_for(request.id)
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect();
        assert_eq!(events.len(), 1, "expected one {event_type} event for {txn}");
        assert_eq!(h.store.request(request.id).unwrap().state.code_name, end_state);
    }

    // Accepted is tracking-only: event recorded, no transition configured.
    let accepted = submitted
        .requests
        .iter()
        .find(|r| r.transaction_id == "T2")
        .unwrap();
    assert_eq!(h.store.request(accepted.id).unwrap().state.code_name, "queued");
}

#[tokio::test]
async fn test_failed_line_records_event_without_journal() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let submitted = h.submitted_batch(vec![h.request(1, "T1", "10.00")]).await;

    let mut line = TestHarness::line("T1", "Failed");
    line.response_code = Some("R01".into());
    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: vec![line],
    };

    let session = Session::new(1);
    let results = h.reconciler.reconcile(&session, &response).await.unwrap();

    assert!(results[0].is_ok());
    assert_eq!(results[0].events[0].event_type, TransferEventType::Failed);
    assert_eq!(results[0].events[0].response_code.as_deref(), Some("R01"));
    assert_eq!(h.ledger.posting_count(), 0);
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let submitted = h
        .submitted_batch(vec![h.request(1, "T1", "1.00"), h.request(3, "T3", "3.00")])
        .await;

    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: vec![
            TestHarness::line("T1", "Succeeded"),
            TestHarness::line("T-unknown", "Succeeded"),
            TestHarness::line("T3", "Failed"),
        ],
    };

    let session = Session::new(1);
    let results = h.reconciler.reconcile(&session, &response).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(!results[1].is_ok());
    assert!(results[2].is_ok());
    assert_eq!(
        results[1].error.as_ref().unwrap().code(),
        "REQUEST_NOT_FOUND"
    );
    // The failed middle line did not prevent the others
    assert_eq!(h.ledger.posting_count(), 1);
}

#[tokio::test]
async fn test_reconcile_twice_is_a_no_op() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let submitted = h.submitted_batch(vec![h.request(1, "T1", "10.00")]).await;
    let request_id = submitted.requests[0].id;

    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: vec![TestHarness::line("T1", "Succeeded")],
    };

    let session = Session::new(1);
    h.reconciler.reconcile(&session, &response).await.unwrap();
    let results = h.reconciler.reconcile(&session, &response).await.unwrap();

    // Second pass returns the stored event and writes nothing new.
    assert!(results[0].is_ok());
    let succeeded: Vec<_> = h
        .store
        .events_for(request_id)
        .into_iter()
        .filter(|e| e.event_type == TransferEventType::Succeeded)
        .collect();
    assert_eq!(succeeded.len(), 1);
    assert_eq!(h.ledger.posting_count(), 1);
    assert_eq!(h.store.transitions().len(), 1);
}

#[tokio::test]
async fn test_unrecognized_status_aborts_file() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let submitted = h.submitted_batch(vec![h.request(1, "T1", "10.00")]).await;
    let request_id = submitted.requests[0].id;

    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: vec![
            TestHarness::line("T1", "Succeeded"),
            TestHarness::line("T1", "Settled"), // not in the status set
        ],
    };

    let session = Session::new(1);
    let err = h.reconciler.reconcile(&session, &response).await.unwrap_err();

    assert_eq!(err.code(), "LOGIC_ERROR");
    assert!(err.aborts_file());
    // Aborted before any side effect: only the assemble-time Queued event.
    assert_eq!(h.store.events_for(request_id).len(), 1);
    assert_eq!(h.ledger.posting_count(), 0);
}

#[tokio::test]
async fn test_unknown_batch_message_is_schema_error() {
    let h = TestHarness::new(ReconcileMode::PerLine);
    let response = FundsResponseFile {
        batch_message: uuid::Uuid::new_v4(),
        lines: vec![TestHarness::line("T1", "Succeeded")],
    };

    let session = Session::new(1);
    let err = h.reconciler.reconcile(&session, &response).await.unwrap_err();
    assert_eq!(err.code(), "SCHEMA_ERROR");
}

#[tokio::test]
async fn test_all_or_nothing_aborts_on_first_bad_line() {
    let h = TestHarness::new(ReconcileMode::AllOrNothing);
    let submitted = h.submitted_batch(vec![h.request(1, "T1", "1.00")]).await;

    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: vec![
            TestHarness::line("T1", "Succeeded"),
            TestHarness::line("T-unknown", "Succeeded"),
        ],
    };

    let session = Session::new(1);
    let err = h.reconciler.reconcile(&session, &response).await.unwrap_err();

    assert_eq!(err.code(), "LINE_FAILED");
    assert_eq!(h.provider.rolled_back(), 1);
}

//! End-to-end settlement round trip over the public API: queue requests,
//! assemble a batch, emit the outbound file, reconcile the response, and
//! check workflow states, events, and ledger postings.

use std::sync::Arc;

use fundflow::accounting::AccountingAction;
use fundflow::accounting::ledger::recording::RecordingLedger;
use fundflow::persistence::memory::MemoryProvider;
use fundflow::session::Session;
use fundflow::settlement::batch::BatchLifecycle;
use fundflow::settlement::crypto::{BankAccountCipher, Base64Cipher};
use fundflow::settlement::inbound::{
    FundsResponseFile, FundsResponseLine, ReconcileMode, ReconcilePaths, ResponseReconciler,
};
use fundflow::settlement::memory::MemorySettlementStore;
use fundflow::settlement::outbound::SettlementFileBuilder;
use fundflow::settlement::types::{
    BankAccount, CollationGroup, CreditSystem, FundsTransferRequest, HydratedBatchMessage,
    SettlementPosting, TransferEventType,
};
use fundflow::workflow::graph::{State, StateGroup, StatePath, WorkflowGraph};
use fundflow::workflow::store::PathResolver;
use fundflow::workflow::store::memory::MemoryGraphSource;

struct Fixture {
    store: Arc<MemorySettlementStore>,
    ledger: Arc<RecordingLedger<SettlementPosting>>,
    lifecycle: BatchLifecycle,
    builder: SettlementFileBuilder,
    reconciler: ResponseReconciler,
    queued: Arc<State>,
}

fn state(id: u32, code_name: &str, group: &Arc<StateGroup>) -> Arc<State> {
    Arc::new(State {
        id,
        code_name: code_name.into(),
        group: group.clone(),
    })
}

fn path(code_name: &str, previous: &Arc<State>, next: &Arc<State>) -> Arc<StatePath> {
    Arc::new(StatePath {
        id: 1,
        code_name: code_name.into(),
        previous: previous.clone(),
        next: next.clone(),
        and_mask: !0,
        or_mask: 0x02,
        pre_actions: Vec::new(),
        post_actions: Vec::new(),
    })
}

fn fixture() -> Fixture {
    let graph = Arc::new(WorkflowGraph {
        id: 1,
        code_name: "transfers".into(),
    });
    let open = Arc::new(StateGroup {
        id: 1,
        code_name: "open".into(),
        graph: graph.clone(),
    });
    let closed = Arc::new(StateGroup {
        id: 2,
        code_name: "closed".into(),
        graph,
    });
    let queued = state(1, "queued", &open);
    let settled = state(2, "settled", &closed);
    let failed = state(3, "failed", &closed);

    let source = Arc::new(MemoryGraphSource::new());
    source.insert(path("settle-succeeded", &queued, &settled));
    source.insert(path("settle-failed", &queued, &failed));

    let store = Arc::new(MemorySettlementStore::new());
    let provider = Arc::new(MemoryProvider::new());
    let ledger: Arc<RecordingLedger<SettlementPosting>> = Arc::new(RecordingLedger::new());
    let accounting: Arc<AccountingAction<SettlementPosting>> = Arc::new(AccountingAction::new(
        "append-settlement",
        ledger.clone(),
        provider.clone(),
    ));

    Fixture {
        lifecycle: BatchLifecycle::new(store.clone(), provider.clone()),
        builder: SettlementFileBuilder::new(Arc::new(Base64Cipher)),
        reconciler: ResponseReconciler::new(
            store.clone(),
            provider.clone(),
            Arc::new(PathResolver::new(source)),
            accounting,
            ReconcilePaths {
                on_accepted: None,
                on_succeeded: Some("settle-succeeded".into()),
                on_failed: Some("settle-failed".into()),
            },
            ReconcileMode::PerLine,
        ),
        store,
        ledger,
        queued,
    }
}

fn request(fx: &Fixture, entity: u64, txn: &str, amount: &str) -> FundsTransferRequest {
    let account = Base64Cipher
        .encrypt(&BankAccount {
            holder_name: "Ada Lovelace".into(),
            account_number: "000123456".into(),
            routing_number: "110000000".into(),
        })
        .unwrap();
    FundsTransferRequest::new(entity, txn, amount.parse().unwrap(), account, fx.queued.clone())
}

fn credit_system() -> CreditSystem {
    CreditSystem {
        id: 1,
        code_name: Some("ach-east".into()),
    }
}

#[tokio::test]
async fn settlement_round_trip() {
    let fx = fixture();

    // Two grouped requests and one standalone.
    let group = CollationGroup {
        id: uuid::Uuid::new_v4(),
        code: "G1".into(),
    };
    let mut a = request(&fx, 1, "T1", "30.00");
    let mut b = request(&fx, 2, "T2", "70.00");
    a.group = Some(group.clone());
    b.group = Some(group);
    let c = request(&fx, 3, "T3", "12.50");

    // Outbound: assemble and emit the file.
    let pending = fx
        .lifecycle
        .assemble("2026-08-06-a", credit_system(), &[a, b, c])
        .await
        .unwrap();
    let file = fx.builder.build(&pending).unwrap();

    assert_eq!(file.credit_system, "ach-east");
    assert_eq!(file.lines.len(), 2);
    let grouped = file.lines.iter().find(|l| l.line_id == "G1").unwrap();
    assert_eq!(grouped.amount.to_string(), "100.00");
    assert_eq!(grouped.account.holder_name, "Ada Lovelace");

    // The wire form parses back.
    let json = file.to_json().unwrap();
    assert!(json.contains("ach-east"));

    // Lifecycle: the external system acknowledges the submission.
    let submitted = fx.lifecycle.mark_submitted(&pending).await.unwrap();
    let submitted = HydratedBatchMessage {
        message: submitted,
        batch: pending.batch.clone(),
        requests: pending.requests.clone(),
    };
    fx.lifecycle.mark_accepted(&submitted).await.unwrap();

    // Inbound: the grouped line settles, the standalone one bounces.
    let response = FundsResponseFile {
        batch_message: submitted.message.id,
        lines: vec![
            FundsResponseLine {
                transaction_id: "G1".into(),
                status: "Succeeded".into(),
                response_code: None,
                trace_code: None,
                comments: None,
            },
            FundsResponseLine {
                transaction_id: "T3".into(),
                status: "Returned".into(),
                response_code: Some("R01".into()),
                trace_code: Some("091000019999999".into()),
                comments: Some("account closed".into()),
            },
        ],
    };

    let session = Session::new(1001);
    let results = fx.reconciler.reconcile(&session, &response).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_ok()));

    // The grouped line fanned out to both members.
    assert_eq!(results[0].events.len(), 2);
    for request in pending.requests.iter().filter(|r| r.group.is_some()) {
        let stored = fx.store.request(request.id).unwrap();
        assert_eq!(stored.state.code_name, "settled");
        assert_eq!(stored.change_stamp, 0x02);
    }

    // The returned line failed its request and kept the reporting fields.
    assert_eq!(results[1].events.len(), 1);
    let returned = &results[1].events[0];
    assert_eq!(returned.event_type, TransferEventType::Returned);
    assert_eq!(returned.response_code.as_deref(), Some("R01"));
    assert_eq!(returned.comments.as_deref(), Some("account closed"));
    let standalone = pending
        .requests
        .iter()
        .find(|r| r.transaction_id == "T3")
        .unwrap();
    assert_eq!(
        fx.store.request(standalone.id).unwrap().state.code_name,
        "failed"
    );

    // Postings: the two succeeded members, nothing for the returned line.
    let amounts: Vec<String> = fx
        .ledger
        .postings()
        .iter()
        .map(|p| p.amount.to_string())
        .collect();
    assert_eq!(amounts.len(), 2);
    assert!(amounts.contains(&"30.00".to_string()));
    assert!(amounts.contains(&"70.00".to_string()));

    // Replay is a no-op.
    let replay = fx.reconciler.reconcile(&session, &response).await.unwrap();
    assert!(replay.iter().all(|r| r.is_ok()));
    assert_eq!(fx.ledger.posting_count(), 2);
}

//! Opaque ledger collaborator
//!
//! The double-entry ledger is consumed as a black box: it accepts a typed
//! billing item and returns whatever it produced. Its own consistency rules
//! are out of scope here.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core_types::{JournalId, TransferEventId};
use crate::persistence::Transaction;
use crate::session::Session;

/// Errors surfaced by the ledger collaborator
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("posting rejected: {0}")]
    Rejected(String),

    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// The typed payload an accounting action consumes to produce a ledger entry.
///
/// Items travel in the traversal arguments map under [`BillingItem::KEY`] and
/// are decoded at extraction time.
pub trait BillingItem: DeserializeOwned + Send + Sync + 'static {
    const KEY: &'static str = "billing_item";
}

/// What a posting produced: an optional journal and an optional transfer
/// event, either of which gets bound onto the current transition.
#[derive(Debug, Clone, Default)]
pub struct LedgerOutcome {
    pub journal: Option<JournalId>,
    pub transfer_event: Option<TransferEventId>,
}

/// One-type-parameter strategy seam: implement per billing item kind.
///
/// Accounting data is access-restricted; implementations may assume the
/// session has been elevated for the lifetime of `tx`.
#[async_trait]
pub trait Ledger<B: BillingItem>: Send + Sync {
    async fn append(
        &self,
        session: &Session,
        item: &B,
        tx: &mut Transaction,
    ) -> Result<LedgerOutcome, LedgerError>;
}

/// Recording ledger for tests and demos.
///
/// Captures every posting, hands out fresh journal ids, and can be told to
/// reject the next append. Refuses postings from non-elevated sessions the
/// way a real ledger backend would.
#[cfg(feature = "memory-store")]
pub mod recording {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;

    pub struct RecordingLedger<B> {
        postings: Mutex<Vec<B>>,
        fail_next: Mutex<bool>,
        require_elevation: bool,
    }

    impl<B> RecordingLedger<B> {
        pub fn new() -> Self {
            Self {
                postings: Mutex::new(Vec::new()),
                fail_next: Mutex::new(false),
                require_elevation: true,
            }
        }

        /// Accept postings from non-elevated sessions too.
        pub fn permissive() -> Self {
            Self {
                require_elevation: false,
                ..Self::new()
            }
        }

        pub fn set_fail_next(&self, fail: bool) {
            *self.fail_next.lock().unwrap() = fail;
        }

        pub fn postings(&self) -> Vec<B>
        where
            B: Clone,
        {
            self.postings.lock().unwrap().clone()
        }

        pub fn posting_count(&self) -> usize {
            self.postings.lock().unwrap().len()
        }
    }

    impl<B> Default for RecordingLedger<B> {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl<B: BillingItem + Clone> Ledger<B> for RecordingLedger<B> {
        async fn append(
            &self,
            session: &Session,
            item: &B,
            _tx: &mut Transaction,
        ) -> Result<LedgerOutcome, LedgerError> {
            if self.require_elevation && !session.is_elevated() {
                return Err(LedgerError::Rejected(
                    "accounting data requires an elevated session".into(),
                ));
            }

            let mut fail = self.fail_next.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(LedgerError::Backend("configured to fail".into()));
            }
            drop(fail);

            self.postings.lock().unwrap().push(item.clone());
            Ok(LedgerOutcome {
                journal: Some(Uuid::new_v4()),
                transfer_event: None,
            })
        }
    }
}

//! Accounting path action
//!
//! Specializes the pipeline for side effects that must post to the ledger:
//! extract the billing item, open a transaction elevated for its whole
//! lifetime, delegate to the ledger strategy, bind the result onto the
//! transition, commit. The elevation must cover the full transaction body
//! because commit-time writes touch restricted data too.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::ledger::{BillingItem, Ledger, LedgerOutcome};
use crate::persistence::{Transaction, TransactionProvider, elevate_transaction_access};
use crate::session::Session;
use crate::workflow::action::{ActionContext, ParamKind, ParamSpec, PathAction};
use crate::workflow::error::WorkflowError;

pub struct AccountingAction<B: BillingItem> {
    name: &'static str,
    ledger: Arc<dyn Ledger<B>>,
    provider: Arc<dyn TransactionProvider>,
    _item: PhantomData<fn() -> B>,
}

impl<B: BillingItem> AccountingAction<B> {
    pub fn new(
        name: &'static str,
        ledger: Arc<dyn Ledger<B>>,
        provider: Arc<dyn TransactionProvider>,
    ) -> Self {
        Self {
            name,
            ledger,
            provider,
            _item: PhantomData,
        }
    }

    /// Journal-append hook: elevate `tx` for its remaining lifetime and post
    /// `item`. The response reconciler calls this per succeeded settlement
    /// line; [`PathAction::execute`] calls it with a transaction of its own.
    pub async fn append_journal(
        &self,
        session: &Session,
        tx: &mut Transaction,
        item: &B,
    ) -> Result<LedgerOutcome, WorkflowError> {
        elevate_transaction_access(session, tx);
        self.ledger
            .append(session, item, tx)
            .await
            .map_err(|e| WorkflowError::Action {
                action: self.name.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl<B: BillingItem> PathAction for AccountingAction<B> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(B::KEY, ParamKind::Object)]
    }

    async fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<(), WorkflowError> {
        let item: B = ctx.args.object(B::KEY)?;

        let mut tx = self.provider.begin().await?;
        match self.append_journal(ctx.session, &mut tx, &item).await {
            Ok(outcome) => {
                if let Some(journal) = outcome.journal {
                    ctx.transition.journal = Some(journal);
                }
                if let Some(event) = outcome.transfer_event {
                    ctx.transition.funds_transfer_event = Some(event);
                }
                tx.commit().await?;
                info!(
                    action = self.name,
                    transition = %ctx.transition.id,
                    "accounting posting committed"
                );
                Ok(())
            }
            Err(err) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, action = self.name, "posting rollback failed");
                }
                Err(err)
            }
        }
    }
}

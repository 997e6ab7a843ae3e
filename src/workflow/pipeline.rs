//! Traversal pipeline
//!
//! One traversal is one sequential unit of work inside one transaction:
//! ordered pre-actions, the state change, ordered post-actions. Any failure
//! rolls the transaction back and leaves the entity as it was found.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::action::{ActionArgs, ActionContext, ActionRegistry, SharedContext};
use super::engine::{StateTransition, Stateful, TransitionEngine};
use super::error::WorkflowError;
use super::graph::{State, StatePath};
use super::store::PathResolver;
use crate::core_types::ChangeStamp;
use crate::persistence::{Transaction, TransactionProvider};
use crate::session::Session;

/// Rollback image of the entity's workflow attributes.
struct EntitySnapshot {
    state: Arc<State>,
    change_stamp: ChangeStamp,
    last_state_change: Option<DateTime<Utc>>,
    last_state_group_change: Option<DateTime<Utc>>,
}

impl EntitySnapshot {
    fn capture(entity: &dyn Stateful) -> Self {
        Self {
            state: entity.state().clone(),
            change_stamp: entity.change_stamp(),
            last_state_change: entity.last_state_change(),
            last_state_group_change: entity.last_state_group_change(),
        }
    }

    fn restore(self, entity: &mut dyn Stateful) {
        entity.set_state(self.state);
        entity.set_change_stamp(self.change_stamp);
        entity.set_last_state_change(self.last_state_change);
        entity.set_last_state_group_change(self.last_state_group_change);
    }
}

/// Runs traversals: path resolution, action execution, transition apply.
pub struct Traversal {
    resolver: Arc<PathResolver>,
    registry: Arc<ActionRegistry>,
    provider: Arc<dyn TransactionProvider>,
}

impl Traversal {
    pub fn new(
        resolver: Arc<PathResolver>,
        registry: Arc<ActionRegistry>,
        provider: Arc<dyn TransactionProvider>,
    ) -> Self {
        Self {
            resolver,
            registry,
            provider,
        }
    }

    /// Follow the path named `code_name` with the given arguments.
    ///
    /// Opens one transaction for the whole traversal. On any failure the
    /// transaction is rolled back and the entity's workflow attributes are
    /// restored, so a rejected traversal never leaves partial mutation.
    pub async fn run(
        &self,
        session: &Session,
        stateful: &mut dyn Stateful,
        code_name: &str,
        args: ActionArgs,
    ) -> Result<StateTransition, WorkflowError> {
        let path = self.resolver.resolve(code_name).await?;
        let mut tx = self.provider.begin().await?;
        let snapshot = EntitySnapshot::capture(stateful);

        match self
            .run_steps(&mut tx, session, stateful, &path, &args)
            .await
        {
            Ok(transition) => match tx.commit().await {
                Ok(()) => {
                    info!(
                        entity = stateful.entity_id(),
                        path = code_name,
                        transition = %transition.id,
                        "traversal committed"
                    );
                    Ok(transition)
                }
                Err(err) => {
                    snapshot.restore(stateful);
                    Err(err.into())
                }
            },
            Err(err) => {
                snapshot.restore(stateful);
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, path = code_name, "traversal rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        tx: &mut Transaction,
        session: &Session,
        stateful: &mut dyn Stateful,
        path: &Arc<StatePath>,
        args: &ActionArgs,
    ) -> Result<StateTransition, WorkflowError> {
        let mut transition = TransitionEngine::begin(stateful, path)?;
        let mut shared = SharedContext::default();

        for name in &path.pre_actions {
            self.run_action(name, tx, session, stateful, &mut transition, args, &mut shared)
                .await?;
        }

        TransitionEngine::apply(stateful, &mut transition)?;

        for name in &path.post_actions {
            self.run_action(name, tx, session, stateful, &mut transition, args, &mut shared)
                .await?;
        }

        Ok(transition)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_action(
        &self,
        name: &str,
        tx: &mut Transaction,
        session: &Session,
        stateful: &mut dyn Stateful,
        transition: &mut StateTransition,
        args: &ActionArgs,
        shared: &mut SharedContext,
    ) -> Result<(), WorkflowError> {
        let action = self.registry.get(name)?;
        args.check(&action.parameter_specs())?;
        debug!(action = name, entity = stateful.entity_id(), "executing path action");

        let mut ctx = ActionContext {
            session,
            tx,
            stateful,
            transition,
            args,
            shared,
        };
        action.execute(&mut ctx).await
    }
}

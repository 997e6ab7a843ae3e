//! Workflow transition engine
//!
//! Validates a requested traversal against the graph, mutates the stateful
//! entity, and produces the immutable transition record. The engine itself
//! never persists anything: the caller's enclosing transaction commits the
//! change alongside any action side effects.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::WorkflowError;
use super::graph::{State, StatePath};
use super::store::PathResolver;
use crate::core_types::{ChangeStamp, EntityId, JournalId, TransferEventId, TransitionId};

/// Capability interface for a domain object under workflow control.
///
/// Implementors expose their workflow attributes; everything else about the
/// entity is opaque to the engine. Mutation happens only through
/// [`TransitionEngine`]. `Send` because traversals hold the entity across
/// suspension points.
pub trait Stateful: Send {
    fn entity_id(&self) -> EntityId;

    fn state(&self) -> &Arc<State>;
    fn set_state(&mut self, state: Arc<State>);

    fn change_stamp(&self) -> ChangeStamp;
    fn set_change_stamp(&mut self, stamp: ChangeStamp);

    fn last_state_change(&self) -> Option<DateTime<Utc>>;
    fn set_last_state_change(&mut self, at: Option<DateTime<Utc>>);

    fn last_state_group_change(&self) -> Option<DateTime<Utc>>;
    fn set_last_state_group_change(&mut self, at: Option<DateTime<Utc>>);
}

/// Immutable audit record of one traversal.
///
/// Created when the traversal opens; `change_stamp_after` and `applied_at`
/// are filled when the path is applied. Never mutated after the traversal
/// commits.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub id: TransitionId,
    pub entity_id: EntityId,
    pub path: Arc<StatePath>,
    pub change_stamp_before: ChangeStamp,
    pub change_stamp_after: Option<ChangeStamp>,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    /// Journal bound by an accounting action, if the traversal posted one.
    pub journal: Option<JournalId>,
    /// Funds-transfer event this traversal produced, if any.
    pub funds_transfer_event: Option<TransferEventId>,
}

/// The transition engine. Stateless; all context arrives as arguments.
pub struct TransitionEngine;

impl TransitionEngine {
    /// Open a transition: validate the entity's current state against the
    /// path and create the audit record. The entity is not touched.
    pub fn begin(
        stateful: &dyn Stateful,
        path: &Arc<StatePath>,
    ) -> Result<StateTransition, WorkflowError> {
        if stateful.state().id != path.previous.id {
            return Err(WorkflowError::IncompatibleState {
                path: path.code_name.clone(),
                expected: path.previous.code_name.clone(),
                current: stateful.state().code_name.clone(),
                entity: stateful.entity_id(),
            });
        }

        Ok(StateTransition {
            id: TransitionId::new(),
            entity_id: stateful.entity_id(),
            path: path.clone(),
            change_stamp_before: stateful.change_stamp(),
            change_stamp_after: None,
            created_at: Utc::now(),
            applied_at: None,
            journal: None,
            funds_transfer_event: None,
        })
    }

    /// Apply an opened transition: timestamps, state, change-stamp masks.
    ///
    /// Re-checks the origin state so that a misbehaving pre-action cannot
    /// slip a mutated entity past validation.
    pub fn apply(
        stateful: &mut dyn Stateful,
        transition: &mut StateTransition,
    ) -> Result<(), WorkflowError> {
        let path = transition.path.clone();
        if stateful.state().id != path.previous.id {
            return Err(WorkflowError::Logic(format!(
                "entity {} left state '{}' while transition {} was open",
                stateful.entity_id(),
                path.previous.code_name,
                transition.id
            )));
        }

        let now = Utc::now();
        stateful.set_last_state_change(Some(now));
        if path.crosses_group() {
            stateful.set_last_state_group_change(Some(now));
        }

        stateful.set_state(path.next.clone());
        let after = path.apply_masks(stateful.change_stamp());
        stateful.set_change_stamp(after);

        transition.change_stamp_after = Some(after);
        transition.applied_at = Some(now);

        debug!(
            entity = stateful.entity_id(),
            path = %path.code_name,
            from = %path.previous.code_name,
            to = %path.next.code_name,
            stamp_before = transition.change_stamp_before,
            stamp_after = after,
            "transition applied"
        );
        Ok(())
    }

    /// Validate and apply in one call. On failure the entity is unmutated.
    pub fn follow_path(
        stateful: &mut dyn Stateful,
        path: &Arc<StatePath>,
    ) -> Result<StateTransition, WorkflowError> {
        let mut transition = Self::begin(stateful, path)?;
        Self::apply(stateful, &mut transition)?;
        Ok(transition)
    }

    /// Convenience form: resolve the path by code name first, then follow it.
    pub async fn follow_path_named(
        resolver: &PathResolver,
        stateful: &mut dyn Stateful,
        code_name: &str,
    ) -> Result<StateTransition, WorkflowError> {
        let path = resolver.resolve(code_name).await?;
        Self::follow_path(stateful, &path)
    }
}


#[cfg(test)]
mod tests {
    use super::testkit::TestEntity;
    use super::*;
    use crate::workflow::graph::fixtures;
    use crate::workflow::store::memory::MemoryGraphSource;

    #[test]
    fn test_follow_path_applies_state_and_masks() {
        // Path "submit": Draft -> Submitted, AND 0xFFFFFFFE, OR 0x00000002.
        // Entity in Draft with stamp 0x05 must end in Submitted with 0x06.
        let (draft, submitted, submit) = fixtures::draft_submit();
        let mut entity = TestEntity::new(7, draft, 0x05);

        let transition = TransitionEngine::follow_path(&mut entity, &submit).unwrap();

        assert_eq!(entity.state.id, submitted.id);
        assert_eq!(entity.change_stamp, 0x06);
        assert_eq!(transition.change_stamp_before, 0x05);
        assert_eq!(transition.change_stamp_after, Some(0x06));
        assert!(transition.applied_at.is_some());
        assert!(entity.last_state_change.is_some());
        // draft and submitted live in different groups
        assert!(entity.last_state_group_change.is_some());
    }

    #[test]
    fn test_same_group_keeps_group_date() {
        let graph = fixtures::graph();
        let open = fixtures::group(1, "open", &graph);
        let a = fixtures::state(1, "a", &open);
        let b = fixtures::state(2, "b", &open);
        let hop = fixtures::path("hop", &a, &b, !0, 0);

        let mut entity = TestEntity::new(1, a, 0);
        TransitionEngine::follow_path(&mut entity, &hop).unwrap();

        assert!(entity.last_state_change.is_some());
        assert!(entity.last_state_group_change.is_none());
    }

    #[test]
    fn test_incompatible_state_leaves_entity_unmutated() {
        let (_, submitted, submit) = fixtures::draft_submit();
        // Entity already in Submitted cannot take the submit path again.
        let mut entity = TestEntity::new(7, submitted.clone(), 0x05);

        let err = TransitionEngine::follow_path(&mut entity, &submit).unwrap_err();

        assert!(matches!(err, WorkflowError::IncompatibleState { .. }));
        assert_eq!(entity.state.id, submitted.id);
        assert_eq!(entity.change_stamp, 0x05);
        assert!(entity.last_state_change.is_none());
    }

    #[test]
    fn test_apply_rejects_entity_moved_while_open() {
        let (draft, submitted, submit) = fixtures::draft_submit();
        let mut entity = TestEntity::new(7, draft, 0);

        let mut transition = TransitionEngine::begin(&entity, &submit).unwrap();
        entity.set_state(submitted);

        let err = TransitionEngine::apply(&mut entity, &mut transition).unwrap_err();
        assert_eq!(err.code(), "LOGIC_ERROR");
    }

    #[tokio::test]
    async fn test_follow_path_named() {
        let source = std::sync::Arc::new(MemoryGraphSource::new());
        let (draft, _, submit) = fixtures::draft_submit();
        source.insert(submit);
        let resolver = PathResolver::new(source);

        let mut entity = TestEntity::new(9, draft, 0x05);
        let transition = TransitionEngine::follow_path_named(&resolver, &mut entity, "submit")
            .await
            .unwrap();

        assert_eq!(transition.change_stamp_after, Some(0x06));
    }
}

//! Workflow graph reference data
//!
//! States, state groups, and state paths are authored by administration
//! tooling and are read-only at runtime. Loaded values are shared via `Arc`
//! and treated as immutable once published.

use std::sync::Arc;

use crate::core_types::{ChangeStamp, StateGroupId, StateId, StatePathId, WorkflowGraphId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    pub id: WorkflowGraphId,
    pub code_name: String,
}

/// A group of states within one graph. Crossing a group boundary is tracked
/// separately on the stateful entity (`last_state_group_change`).
#[derive(Debug, Clone)]
pub struct StateGroup {
    pub id: StateGroupId,
    pub code_name: String,
    pub graph: Arc<WorkflowGraph>,
}

/// A node in the workflow graph.
#[derive(Debug, Clone)]
pub struct State {
    pub id: StateId,
    pub code_name: String,
    pub group: Arc<StateGroup>,
}

impl State {
    pub fn same_group(&self, other: &State) -> bool {
        self.group.id == other.group.id
    }
}

/// A permitted directed edge between two states.
///
/// Pre/post actions are named in execution order; the traversal pipeline
/// resolves names against its [`ActionRegistry`](super::action::ActionRegistry).
#[derive(Debug, Clone)]
pub struct StatePath {
    pub id: StatePathId,
    /// Unique across the graph; the handle callers request traversals by.
    pub code_name: String,
    pub previous: Arc<State>,
    pub next: Arc<State>,
    pub and_mask: ChangeStamp,
    pub or_mask: ChangeStamp,
    /// Executed in order, before the state change.
    pub pre_actions: Vec<String>,
    /// Executed in order, after the state change.
    pub post_actions: Vec<String>,
}

impl StatePath {
    /// `stamp' = (stamp & and_mask) | or_mask` - deterministic per path.
    pub fn apply_masks(&self, stamp: ChangeStamp) -> ChangeStamp {
        (stamp & self.and_mask) | self.or_mask
    }

    /// Whether this edge leaves the origin state's group.
    pub fn crosses_group(&self) -> bool {
        !self.previous.same_group(&self.next)
    }
}

//! Workflow Transition Engine
//!
//! Governs controlled transitions of stateful entities through a finite
//! workflow graph. A traversal follows a configured state path, running its
//! side-effecting actions inside one transaction.
//!
//! # Traversal
//!
//! ```text
//! resolve path → begin tx → pre-actions (in order) → apply transition
//!              → post-actions (in order) → commit
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Validate-Before-Mutate**: The entity is untouched unless its current
//!    state matches the path's origin
//! 2. **All-Or-Nothing**: Any failure rolls the transaction back and restores
//!    the entity's workflow attributes
//! 3. **Deterministic Stamps**: `stamp' = (stamp & and_mask) | or_mask`, the
//!    same for every traversal of a path
//! 4. **Ordered Actions**: Pre/post actions execute in declaration order

pub mod action;
pub mod engine;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod store;

// Re-exports for convenience
pub use action::{ActionArgs, ActionContext, ActionRegistry, ParamKind, ParamSpec, PathAction};
pub use engine::{StateTransition, Stateful, TransitionEngine};
pub use error::WorkflowError;
pub use graph::{State, StateGroup, StatePath, WorkflowGraph};
pub use pipeline::Traversal;
pub use store::{PathResolver, StateGraphSource};

//! Core types used throughout the system
//!
//! Identifier aliases and newtypes shared by the workflow and settlement
//! modules. They provide semantic meaning and enable future type evolution.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Stateful entity ID - unique within the owning container.
///
/// Primary key for the domain object whose lifecycle is workflow-governed.
pub type EntityId = u64;

/// User ID - globally unique, immutable after assignment
pub type UserId = u64;

/// Workflow reference data IDs.
///
/// Assigned by administration tooling; read-only at runtime.
pub type StateId = u32;
pub type StateGroupId = u32;
pub type WorkflowGraphId = u32;
pub type StatePathId = u32;

/// Change stamp - opaque bitmask on a stateful entity.
///
/// Mutated only by the transition engine as `(stamp & and_mask) | or_mask`,
/// used for downstream feature gating independent of state.
pub type ChangeStamp = u32;

/// Batch, batch message, and journal IDs travel on the wire, so UUID.
pub type BatchId = Uuid;
pub type BatchMessageId = Uuid;
pub type JournalId = Uuid;

/// Transfer request ID - ULID-based unique identifier
///
/// Using ULID provides:
/// - Monotonic, sortable IDs
/// - No coordination needed (no machine_id)
/// - 128-bit with good entropy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferRequestId(ulid::Ulid);

impl TransferRequestId {
    /// Generate a new unique TransferRequestId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the inner ULID value
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransferRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferRequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Transfer event ID - ULID-based, sortable by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferEventId(ulid::Ulid);

impl TransferEventId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransferEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferEventId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// State transition ID - one per traversal, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(ulid::Ulid);

impl TransitionId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransitionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

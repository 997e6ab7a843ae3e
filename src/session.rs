//! Session and access elevation
//!
//! A `Session` is the security context a traversal runs under. Access checks
//! elsewhere in the system consult `Session::is_elevated`; elevation is
//! granted through scoped guards that nest via a reference count, so checks
//! are suppressed only while the outermost guard is open and restored the
//! moment it closes - on every exit path, including error paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core_types::UserId;

/// Security context for one caller.
///
/// Cheap to clone; clones share the same elevation counter.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: UserId,
    elevation: Arc<AtomicUsize>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            elevation: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether access checks are currently suppressed.
    pub fn is_elevated(&self) -> bool {
        self.elevation.load(Ordering::SeqCst) > 0
    }

    /// Acquire a scoped elevation guard.
    ///
    /// Guards nest: dropping an inner guard does not end elevation while an
    /// outer guard is still open.
    pub fn elevated(&self) -> ElevatedScope {
        self.elevation.fetch_add(1, Ordering::SeqCst);
        ElevatedScope {
            counter: self.elevation.clone(),
        }
    }
}

/// Disposable elevation guard. Releases on drop.
#[derive(Debug)]
pub struct ElevatedScope {
    counter: Arc<AtomicUsize>,
}

impl Drop for ElevatedScope {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

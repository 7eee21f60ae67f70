//! Operation lock
//!
//! Serializes engine operations across threads and rejects re-entry from the
//! same thread. External services run inside an operation; if one of them
//! calls back into the engine, the nested call sees the in-flight marker and
//! fails with [`Error::Reentrancy`] instead of observing half-applied state.
//!
//! Reward ingestion is the one exception: it is admitted while another
//! operation is in flight (the delivery service reports referral rewards
//! during a payout) and only touches reward fields.

use crate::{Error, Result};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;

type Marker = Cell<Option<&'static str>>;

/// Lock held for the duration of an engine operation
#[derive(Debug, Default)]
pub(crate) struct OperationLock {
    active: ReentrantMutex<Marker>,
}

/// Exclusive hold on the engine; clears the in-flight marker on drop
pub(crate) struct OperationGuard<'a> {
    held: ReentrantMutexGuard<'a, Marker>,
}

impl OperationLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter `operation`, failing if this thread is already inside one
    pub(crate) fn enter(&self, operation: &'static str) -> Result<OperationGuard<'_>> {
        let held = self.active.lock();
        if let Some(active) = held.get() {
            tracing::error!(active, attempted = operation, "Reentrant call rejected");
            return Err(Error::Reentrancy {
                active,
                attempted: operation,
            });
        }
        held.set(Some(operation));
        Ok(OperationGuard { held })
    }

    /// Serialize against other threads without claiming the in-flight marker
    pub(crate) fn enter_nested(&self) -> ReentrantMutexGuard<'_, Marker> {
        self.active.lock()
    }
}

impl OperationGuard<'_> {
    /// Name of the operation holding the lock
    pub(crate) fn operation(&self) -> &'static str {
        self.held.get().unwrap_or("unknown")
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        tracing::trace!(operation = self.operation(), "Operation finished");
        self.held.set(None);
    }
}

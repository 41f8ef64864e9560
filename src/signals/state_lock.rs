/*!
 * Global State Lock
 * Serializes interpreter-state access between the host and signal dispatch
 */

use parking_lot::{Mutex, MutexGuard};

/// Held while the lock is acquired; dropping it releases the lock
pub type StateGuard<'a> = MutexGuard<'a, ()>;

/// Process-wide lock shared with the host's global interpreter lock
///
/// Lock order is always trap table first, then this lock. The host must not
/// hold it across a safe point, since the drain acquires it itself.
#[derive(Debug, Default)]
pub struct StateLock {
    inner: Mutex<()>,
}

impl StateLock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// `state_lock` hook
    pub fn state_lock(&self) -> StateGuard<'_> {
        self.inner.lock()
    }

    /// `state_unlock` hook
    pub fn state_unlock(&self, guard: StateGuard<'_>) {
        drop(guard);
    }
}

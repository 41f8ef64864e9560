/*!
 * Trap Table
 * Lock-guarded mapping from signal number to installed action
 */

use super::registry::MAX_SIGNALS;
use super::types::HandlerAction;
use parking_lot::{Mutex, MutexGuard};

/// Installed actions indexed by signal number
///
/// Every slot holds exactly one action at all times, starting at `Default`.
#[derive(Debug)]
pub struct TrapTable {
    slots: Mutex<Vec<HandlerAction>>,
}

/// Exclusive access to the table for the duration of an install or lookup
pub struct TrapTableGuard<'a> {
    slots: MutexGuard<'a, Vec<HandlerAction>>,
}

impl TrapTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(vec![HandlerAction::Default; MAX_SIGNALS]),
        }
    }

    /// Acquire the table lock
    ///
    /// Must be taken before the state lock.
    pub fn lock(&self) -> TrapTableGuard<'_> {
        TrapTableGuard {
            slots: self.slots.lock(),
        }
    }

    /// Copy of the action for a signal
    pub fn action_for(&self, signo: i32) -> HandlerAction {
        self.lock().get(signo).clone()
    }
}

impl Default for TrapTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapTableGuard<'_> {
    // Callers validate `signo` against the registry, which never exceeds the bound
    fn index(signo: i32) -> usize {
        debug_assert!(signo >= 0 && (signo as usize) < MAX_SIGNALS);
        signo as usize
    }

    pub fn get(&self, signo: i32) -> &HandlerAction {
        &self.slots[Self::index(signo)]
    }

    /// Store a new action, returning the one it replaced
    pub fn replace(&mut self, signo: i32, action: HandlerAction) -> HandlerAction {
        std::mem::replace(&mut self.slots[Self::index(signo)], action)
    }

    /// Clear a slot back to `Default`, returning what was there
    pub fn take(&mut self, signo: i32) -> HandlerAction {
        std::mem::take(&mut self.slots[Self::index(signo)])
    }
}

/*!
 * Lock-Free Trap Statistics
 * Uses atomic counters for zero-contention stats tracking on the dispatch path
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of trap statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapStats {
    pub signals_received: u64,
    pub signals_dispatched: u64,
    pub handlers_invoked: u64,
    pub exceptions_raised: u64,
    pub signals_ignored: u64,
    pub traps_installed: u64,
    pub drains: u64,
}

/// Atomic trap statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct AtomicTrapStats {
    signals_dispatched: AtomicU64,
    handlers_invoked: AtomicU64,
    exceptions_raised: AtomicU64,
    signals_ignored: AtomicU64,
    traps_installed: AtomicU64,
    drains: AtomicU64,
}

impl AtomicTrapStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_dispatched(&self) {
        self.signals_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_handlers_invoked(&self) {
        self.handlers_invoked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_exceptions_raised(&self) {
        self.exceptions_raised.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_ignored(&self) {
        self.signals_ignored.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_installed(&self) {
        self.traps_installed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_drains(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot; `received` comes from the pending set
    pub fn snapshot(&self, received: u64) -> TrapStats {
        TrapStats {
            signals_received: received,
            signals_dispatched: self.signals_dispatched.load(Ordering::Relaxed),
            handlers_invoked: self.handlers_invoked.load(Ordering::Relaxed),
            exceptions_raised: self.exceptions_raised.load(Ordering::Relaxed),
            signals_ignored: self.signals_ignored.load(Ordering::Relaxed),
            traps_installed: self.traps_installed.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
        }
    }
}

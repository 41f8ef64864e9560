/*!
 * Deferred Delivery Dispatcher
 * Native signal handler body and the pending set it writes to
 *
 * Everything reachable from `on_signal` must be async-signal-safe: lock-free
 * atomics only. No allocation, no locks, no logging.
 */

use super::registry::MAX_SIGNALS;
use nix::libc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Set of signal numbers awaiting a safe point
///
/// One bit per signal number. Repeated deliveries before a drain collapse
/// into the same bit, so a signal is dispatched at most once per drain.
#[repr(C, align(64))]
pub struct PendingSet {
    bits: AtomicU64,
    received: AtomicU64,
}

impl PendingSet {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
            received: AtomicU64::new(0),
        }
    }

    /// Mark a signal pending (async-signal-safe)
    ///
    /// Returns false when `signo` has no bit in the set.
    #[inline(always)]
    pub fn mark(&self, signo: i32) -> bool {
        if signo <= 0 || signo as usize >= MAX_SIGNALS {
            return false;
        }
        self.bits.fetch_or(1u64 << signo, Ordering::SeqCst);
        self.received.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Clear a signal's marker, returning whether it was set
    #[inline]
    pub fn take(&self, signo: i32) -> bool {
        let bit = 1u64 << signo;
        self.bits.fetch_and(!bit, Ordering::SeqCst) & bit != 0
    }

    #[inline(always)]
    pub fn any(&self) -> bool {
        self.bits.load(Ordering::SeqCst) != 0
    }

    /// Pending signal numbers in ascending order
    pub fn snapshot(&self) -> Vec<i32> {
        let mut bits = self.bits.load(Ordering::SeqCst);
        let mut out = Vec::with_capacity(bits.count_ones() as usize);
        while bits != 0 {
            let signo = bits.trailing_zeros();
            out.push(signo as i32);
            bits &= bits - 1;
        }
        out
    }

    /// Total deliveries observed, including coalesced ones
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.bits.store(0, Ordering::SeqCst);
    }
}

impl Default for PendingSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide pending set written by the native handler
pub static PENDING: PendingSet = PendingSet::new();

/// Native handler registered with the OS for caught signals
///
/// A delivery that cannot be recorded would be lost silently, so the
/// process aborts instead.
pub extern "C" fn on_signal(signo: libc::c_int) {
    if !PENDING.mark(signo) {
        std::process::abort();
    }
}

/*!
 * Safe-Point Delivery
 * Integrates deferred signal dispatch with the host's bytecode loop
 */

use super::traits::SafePoint;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Safe-point hook for interpreter integration
///
/// The host calls [`SafePointHook::check`] between instructions, at loop
/// back-edges and at call boundaries.
pub struct SafePointHook<S>
where
    S: SafePoint,
{
    traps: Arc<S>,
    checks: AtomicU64,
}

impl<S> SafePointHook<S>
where
    S: SafePoint,
{
    pub fn new(traps: Arc<S>) -> Self {
        Self {
            traps,
            checks: AtomicU64::new(0),
        }
    }

    /// Deliver pending signals before the interpreter continues
    ///
    /// Returns the number of signals dispatched. An error is the exception the
    /// host must raise at this point.
    #[inline]
    pub fn check(&self) -> anyhow::Result<usize> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        if !self.traps.has_pending() {
            return Ok(0);
        }

        trace!("Pending signals at safe point");
        let delivered = self.traps.run_pending()?;
        debug!(delivered, "Delivered signals at safe point");
        Ok(delivered)
    }

    /// Number of safe points reached so far
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    pub fn traps(&self) -> &Arc<S> {
        &self.traps
    }
}

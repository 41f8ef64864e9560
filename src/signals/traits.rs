/*!
 * Signal Traits
 * Seams between the trap core, the OS and the embedding host
 */

use super::types::{Disposition, TrapResult};

/// Native signal registration
///
/// Implementations change how the OS treats a signal number. Called only
/// while the trap table lock is held, so implementations need no locking of
/// their own.
pub trait NativeSignals: Send + Sync {
    /// Set the disposition for a signal, returning the previous one
    fn set_disposition(&self, signo: i32, disposition: Disposition) -> TrapResult<Disposition>;
}

/// Hook the host's bytecode loop calls between instructions
pub trait SafePoint: Send + Sync {
    /// Cheap check for pending work
    fn has_pending(&self) -> bool;

    /// Dispatch pending signals; an error is an exception to raise
    fn run_pending(&self) -> anyhow::Result<usize>;
}

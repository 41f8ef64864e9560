/*!
 * Signals Module
 * Signal traps for an embedded script runtime, delivered at safe points
 */

mod bootstrap;
pub mod config;
mod delivery;
pub mod dispatcher;
pub mod exception;
mod manager;
mod native;
pub mod registry;
mod state_lock;
mod stats;
mod table;
pub mod traits;
pub mod types;

// Re-export public API
pub use bootstrap::{default_exception, default_trap_numbers};
pub use config::{TrapConfig, DEFAULT_TRAPS};
pub use delivery::SafePointHook;
pub use dispatcher::{on_signal, PendingSet, PENDING};
pub use exception::{ExceptionKind, SignalException, INTERRUPT_MESSAGE};
pub use manager::{SignalTraps, SignalTrapsBuilder};
pub use native::NixSignals;
pub use registry::{name_for, number_for, signal_list, SignalDescriptor, EXIT, MAX_SIGNALS};
pub use state_lock::{StateGuard, StateLock};
pub use stats::{AtomicTrapStats, TrapStats};
pub use table::{TrapTable, TrapTableGuard};
pub use traits::*;
pub use types::{
    ActionSpec, DispatchOutcome, Disposition, HandlerAction, SignalArg, SignalId, TrapError,
    TrapHandler, TrapResult,
};

/// `Signal.signame(number)`
pub fn signal_name(number: i32) -> Option<&'static str> {
    registry::name_for(number)
}

/*!
 * Signal Trap Library
 * Signal traps for embedded script runtimes, exposed as a library
 */

pub mod monitoring;
pub mod signals;

// Re-exports
pub use monitoring::init_tracing;
pub use signals::{
    signal_list, signal_name, ActionSpec, SafePointHook, SignalArg, SignalException, SignalId,
    SignalTraps, StateLock, TrapConfig, TrapError, TrapHandler, TrapResult,
};

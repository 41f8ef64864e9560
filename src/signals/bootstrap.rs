/*!
 * Default Trap Bootstrap
 * Startup installation of the signals that raise by default
 */

use super::config::{TrapConfig, DEFAULT_TRAPS};
use super::exception::SignalException;
use super::manager::SignalTraps;
use super::registry;
use super::types::TrapResult;
use nix::libc;
use tracing::debug;

/// Registry numbers of the default-trap signals, in registry order
pub fn default_trap_numbers() -> Vec<i32> {
    registry::all()
        .iter()
        .filter(|desc| DEFAULT_TRAPS.contains(&desc.name))
        .map(|desc| desc.number)
        .collect()
}

/// Bitmask of default-trap signal numbers
pub fn default_mask() -> u64 {
    default_trap_numbers()
        .into_iter()
        .fold(0u64, |mask, signo| mask | (1u64 << signo))
}

/// Exception a default trap raises
///
/// INT raises an interrupt, the rest a `SignalException` named `SIG<name>`.
pub fn default_exception(signo: i32, config: &TrapConfig) -> Option<SignalException> {
    if signo == libc::SIGINT {
        return Some(SignalException::interrupt_with_message(
            config.interrupt_message.clone(),
        ));
    }
    let name = registry::name_for(signo)?;
    if !DEFAULT_TRAPS.contains(&name) {
        return None;
    }
    SignalException::new(signo).ok()
}

/// Catch every default-trap signal still at `Default` natively
///
/// Returns how many native handlers were installed.
pub fn install_default_traps(traps: &SignalTraps) -> TrapResult<usize> {
    let mut installed = 0;
    for signo in default_trap_numbers() {
        if traps.install_default_trap(signo)? {
            installed += 1;
        }
    }
    debug!(count = installed, "Default traps installed");
    Ok(installed)
}

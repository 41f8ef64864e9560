/*!
 * Native Signal Registration
 * sigaction-backed implementation of the registration seam
 */

use super::dispatcher::on_signal;
use super::registry;
use super::traits::NativeSignals;
use super::types::{Disposition, TrapError, TrapResult};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::debug;

/// Registers dispositions with the OS through `sigaction(2)`
#[derive(Debug, Default, Clone, Copy)]
pub struct NixSignals;

impl NixSignals {
    pub fn new() -> Self {
        Self
    }
}

fn to_native(signo: i32) -> TrapResult<Signal> {
    Signal::try_from(signo).map_err(|e| TrapError::NativeRegistration {
        signal: registry::name_for(signo).unwrap_or("?").to_string(),
        reason: e.to_string(),
    })
}

fn from_handler(handler: SigHandler) -> Disposition {
    match handler {
        SigHandler::SigDfl => Disposition::System,
        SigHandler::SigIgn => Disposition::Ignore,
        _ => Disposition::Catch,
    }
}

impl NativeSignals for NixSignals {
    fn set_disposition(&self, signo: i32, disposition: Disposition) -> TrapResult<Disposition> {
        let signal = to_native(signo)?;

        let mut flags = SaFlags::empty();
        let handler = match disposition {
            Disposition::Catch => {
                // Delivery may re-enter while a previous one is still marking
                flags |= SaFlags::SA_NODEFER;
                SigHandler::Handler(on_signal)
            }
            Disposition::Ignore => {
                if signal == Signal::SIGCHLD {
                    flags |= SaFlags::SA_NOCLDWAIT;
                }
                SigHandler::SigIgn
            }
            Disposition::System => SigHandler::SigDfl,
        };

        let action = SigAction::new(handler, flags, SigSet::empty());
        // SAFETY: `on_signal` only touches lock-free atomics.
        let old = unsafe { sigaction(signal, &action) }.map_err(|errno| {
            TrapError::NativeRegistration {
                signal: signal.as_str().trim_start_matches("SIG").to_string(),
                reason: errno.desc().to_string(),
            }
        })?;

        debug!(
            signal = signo,
            disposition = ?disposition,
            "native disposition updated"
        );
        Ok(from_handler(old.handler()))
    }
}

/*!
 * Trap Configuration
 *
 * Startup configuration for the trap subsystem
 */

use super::exception::INTERRUPT_MESSAGE;

/// Signals that raise an exception by default
pub const DEFAULT_TRAPS: &[&str] = &["INT", "HUP", "TERM", "QUIT", "ALRM", "USR1", "USR2"];

/// Trap subsystem configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapConfig {
    /// Catch the default-trap signals natively at startup
    pub install_default_traps: bool,
    /// Message carried by interrupts raised on INT
    pub interrupt_message: String,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            install_default_traps: true,
            interrupt_message: INTERRUPT_MESSAGE.to_string(),
        }
    }
}

impl TrapConfig {
    /// Leave every native disposition untouched until the host traps one
    pub fn bare() -> Self {
        Self {
            install_default_traps: false,
            ..Self::default()
        }
    }

    /// Read overrides from the environment
    ///
    /// Environment variables:
    /// - SIGNAL_TRAP_DEFAULTS: install default traps (default: true)
    /// - SIGNAL_TRAP_INTERRUPT_MESSAGE: interrupt message (default: "Interrupt")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let install_default_traps = std::env::var("SIGNAL_TRAP_DEFAULTS")
            .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
            .unwrap_or(defaults.install_default_traps);
        let interrupt_message = std::env::var("SIGNAL_TRAP_INTERRUPT_MESSAGE")
            .unwrap_or(defaults.interrupt_message);

        Self {
            install_default_traps,
            interrupt_message,
        }
    }

    pub fn with_interrupt_message(mut self, message: impl Into<String>) -> Self {
        self.interrupt_message = message.into();
        self
    }
}

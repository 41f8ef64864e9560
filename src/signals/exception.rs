/*!
 * Signal Exceptions
 * Catchable values representing a delivered signal
 */

use super::registry::{self, SIG_PREFIX};
use super::types::{SignalArg, TrapError, TrapResult};
use nix::libc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default message carried by an interrupt
pub const INTERRUPT_MESSAGE: &str = "Interrupt";

/// Exception kind
///
/// `Interrupt` is a specialization of `Signal`: anything matching on
/// [`SignalException`] sees both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    Signal,
    Interrupt,
}

/// A delivered signal as a catchable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalException {
    kind: ExceptionKind,
    signal_number: i32,
    display_name: String,
    message: String,
}

impl SignalException {
    /// `SignalException.new(sig_name_or_number)`
    pub fn new(arg: impl Into<SignalArg>) -> TrapResult<Self> {
        Self::build(arg.into(), None)
    }

    /// `SignalException.new(sig_number, name)`
    ///
    /// The override name is only accepted alongside a numeric signal.
    pub fn with_name(arg: impl Into<SignalArg>, name: impl Into<String>) -> TrapResult<Self> {
        Self::build(arg.into(), Some(name.into()))
    }

    fn build(arg: SignalArg, name: Option<String>) -> TrapResult<Self> {
        match arg {
            SignalArg::Integer(n) => {
                let number = i32::try_from(n)
                    .ok()
                    .filter(|n| registry::name_for(*n).is_some())
                    .ok_or_else(|| {
                        TrapError::InvalidArgument(format!("invalid signal number ({})", n))
                    })?;
                Ok(Self::from_registered(number, name))
            }
            SignalArg::String(s) | SignalArg::Symbol(s) => {
                if name.is_some() {
                    return Err(TrapError::InvalidArgument(
                        "wrong number of arguments (given 2, expected 1)".to_string(),
                    ));
                }
                let number = registry::number_for(&s).ok_or_else(|| {
                    TrapError::InvalidArgument(format!("unsupported name `{}'", s))
                })?;
                Ok(Self::from_registered(number, None))
            }
            SignalArg::Other(class) => Err(TrapError::WrongType(format!(
                "unsupported type `{}'",
                class
            ))),
        }
    }

    // `number` must already be in the registry
    fn from_registered(number: i32, name: Option<String>) -> Self {
        let display_name = name.unwrap_or_else(|| {
            format!(
                "{}{}",
                SIG_PREFIX,
                registry::name_for(number).unwrap_or_default()
            )
        });
        Self {
            kind: ExceptionKind::Signal,
            signal_number: number,
            message: display_name.clone(),
            display_name,
        }
    }

    /// `Interrupt.new` with the default message
    pub fn interrupt() -> Self {
        Self::interrupt_with_message(INTERRUPT_MESSAGE)
    }

    /// `Interrupt.new(message)`
    pub fn interrupt_with_message(message: impl Into<String>) -> Self {
        let mut exc = Self::from_registered(libc::SIGINT, Some(message.into()));
        exc.kind = ExceptionKind::Interrupt;
        exc
    }

    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub fn is_interrupt(&self) -> bool {
        self.kind == ExceptionKind::Interrupt
    }

    pub fn signal_number(&self) -> i32 {
        self.signal_number
    }

    /// Signal name as reported by `signm`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Host-visible class name
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            ExceptionKind::Signal => "SignalException",
            ExceptionKind::Interrupt => "Interrupt",
        }
    }
}

impl fmt::Display for SignalException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.class_name())
    }
}

impl std::error::Error for SignalException {}

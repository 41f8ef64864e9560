/*!
 * Signal Trap Types
 * Signal identifiers, handler actions and error types
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Trap operation result
pub type TrapResult<T> = Result<T, TrapError>;

/// Trap errors
///
/// All of these are raised synchronously at the call site of the installation
/// API or an exception constructor, never from signal context.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TrapError {
    #[error("{0}")]
    #[diagnostic(
        code(trap::invalid_argument),
        help("Check the signal number, the handler token and the argument count.")
    )]
    InvalidArgument(String),

    #[error("{0}")]
    #[diagnostic(
        code(trap::wrong_type),
        help("Signals are identified by an integer, a string or a symbol.")
    )]
    WrongType(String),

    #[error("unsupported signal `{0}'")]
    #[diagnostic(
        code(trap::unsupported_signal),
        help("Use Signal.list to see the signals available on this platform.")
    )]
    UnsupportedSignal(String),

    #[error("failed to register native handler for SIG{signal}: {reason}")]
    #[diagnostic(
        code(trap::native_registration),
        help("KILL and STOP cannot be caught or ignored.")
    )]
    NativeRegistration { signal: String, reason: String },

    #[error("signal traps are already owned by another interpreter state")]
    #[diagnostic(
        code(trap::already_owned),
        help("Drop the existing SignalTraps before building a new native-backed one.")
    )]
    AlreadyOwned,
}

/// Host-side value passed where a signal is expected
///
/// Mirrors the value kinds a script runtime hands over; the core never probes
/// types at runtime beyond this tag.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalArg {
    Integer(i64),
    String(String),
    Symbol(String),
    /// Any other host value, carrying its class name for diagnostics
    Other(String),
}

impl From<i64> for SignalArg {
    fn from(n: i64) -> Self {
        SignalArg::Integer(n)
    }
}

impl From<i32> for SignalArg {
    fn from(n: i32) -> Self {
        SignalArg::Integer(n as i64)
    }
}

impl From<&str> for SignalArg {
    fn from(s: &str) -> Self {
        SignalArg::String(s.to_string())
    }
}

impl From<String> for SignalArg {
    fn from(s: String) -> Self {
        SignalArg::String(s)
    }
}

/// Resolved signal identifier accepted by the installation API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalId {
    Number(i64),
    Name(String),
}

impl TryFrom<SignalArg> for SignalId {
    type Error = TrapError;

    fn try_from(arg: SignalArg) -> TrapResult<Self> {
        match arg {
            SignalArg::Integer(n) => Ok(SignalId::Number(n)),
            SignalArg::String(s) | SignalArg::Symbol(s) => Ok(SignalId::Name(s)),
            SignalArg::Other(class) => Err(TrapError::WrongType(format!(
                "unsupported type `{}'",
                class
            ))),
        }
    }
}

impl From<i32> for SignalId {
    fn from(n: i32) -> Self {
        SignalId::Number(n as i64)
    }
}

impl From<&str> for SignalId {
    fn from(s: &str) -> Self {
        SignalId::Name(s.to_string())
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalId::Number(n) => write!(f, "{}", n),
            SignalId::Name(s) => write!(f, "{}", s),
        }
    }
}

type HandlerFn = dyn Fn() -> anyhow::Result<()> + Send + Sync;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Callable trap handler
///
/// Equality is identity: two clones of the same handler compare equal, two
/// handlers built from identical closures do not.
#[derive(Clone)]
pub struct TrapHandler {
    id: u64,
    func: Arc<HandlerFn>,
}

impl TrapHandler {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed),
            func: Arc::new(func),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Invoke in interpreter context
    pub fn call(&self) -> anyhow::Result<()> {
        (self.func)()
    }
}

impl PartialEq for TrapHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrapHandler {}

impl fmt::Debug for TrapHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrapHandler#{}", self.id)
    }
}

/// Action installed for a signal number
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandlerAction {
    /// Default behavior
    #[default]
    Default,
    /// Ignore signal
    Ignore,
    /// Invoke handler at the next safe point
    Callable(TrapHandler),
}

impl HandlerAction {
    /// Get disposition the OS should apply for this action
    pub fn disposition(&self, raises_by_default: bool) -> Disposition {
        match self {
            HandlerAction::Default if raises_by_default => Disposition::Catch,
            HandlerAction::Default => Disposition::System,
            HandlerAction::Ignore => Disposition::Ignore,
            HandlerAction::Callable(_) => Disposition::Catch,
        }
    }
}

/// Action as seen by callers of the installation API
///
/// The same vocabulary is accepted and returned, so the result of one `trap`
/// call can be passed back to restore the previous handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpec {
    Default,
    Ignore,
    Handler(TrapHandler),
}

impl ActionSpec {
    /// Parse a script-level sentinel token
    pub fn from_token(token: &str) -> TrapResult<Self> {
        match token {
            "" | "SIG_IGN" | "IGNORE" => Ok(ActionSpec::Ignore),
            "SIG_DFL" | "DEFAULT" => Ok(ActionSpec::Default),
            _ => Err(TrapError::InvalidArgument(format!(
                "bad handler `{}'",
                token
            ))),
        }
    }

    /// Parse a script value that may be nil; nil ignores the signal
    pub fn from_script_value(value: Option<&str>) -> TrapResult<Self> {
        match value {
            None => Ok(ActionSpec::Ignore),
            Some(token) => Self::from_token(token),
        }
    }

    /// Canonical token, `None` for callables
    pub fn token(&self) -> Option<&'static str> {
        match self {
            ActionSpec::Default => Some("DEFAULT"),
            ActionSpec::Ignore => Some("IGNORE"),
            ActionSpec::Handler(_) => None,
        }
    }
}

impl From<ActionSpec> for HandlerAction {
    fn from(spec: ActionSpec) -> Self {
        match spec {
            ActionSpec::Default => HandlerAction::Default,
            ActionSpec::Ignore => HandlerAction::Ignore,
            ActionSpec::Handler(h) => HandlerAction::Callable(h),
        }
    }
}

impl From<HandlerAction> for ActionSpec {
    fn from(action: HandlerAction) -> Self {
        match action {
            HandlerAction::Default => ActionSpec::Default,
            HandlerAction::Ignore => ActionSpec::Ignore,
            HandlerAction::Callable(h) => ActionSpec::Handler(h),
        }
    }
}

impl From<TrapHandler> for ActionSpec {
    fn from(h: TrapHandler) -> Self {
        ActionSpec::Handler(h)
    }
}

/// Native disposition requested from the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Route delivery through the deferred dispatcher
    Catch,
    /// Discard delivery
    Ignore,
    /// Platform default (commonly termination)
    System,
}

/// Result of dispatching one pending signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Callable handler ran to completion
    HandlerInvoked(u64),
    /// Signal was ignored
    Ignored,
    /// Default action had nothing to raise
    Unhandled,
}

/*!
 * Signal Trap Manager
 * Installation API and safe-point drain over the process-wide trap table
 */

use super::bootstrap;
use super::config::TrapConfig;
use super::dispatcher::{PendingSet, PENDING};
use super::exception::SignalException;
use super::native::NixSignals;
use super::registry::{self, EXIT, MAX_SIGNALS};
use super::state_lock::{StateGuard, StateLock};
use super::stats::{AtomicTrapStats, TrapStats};
use super::table::TrapTable;
use super::traits::{NativeSignals, SafePoint};
use super::types::{
    ActionSpec, DispatchOutcome, Disposition, HandlerAction, SignalId, TrapError, TrapHandler,
    TrapResult,
};
use crate::monitoring::DrainSpan;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Set while a `SignalTraps` owns the process-wide pending set
static GLOBAL_OWNED: AtomicBool = AtomicBool::new(false);

/// Process-wide signal trap state
///
/// All mutation of the trap table goes through [`SignalTraps::trap`]. Both
/// installation and dispatch take the table lock and then the state lock.
pub struct SignalTraps {
    table: TrapTable,
    state: Arc<StateLock>,
    native: Box<dyn NativeSignals>,
    pending: &'static PendingSet,
    stats: AtomicTrapStats,
    config: TrapConfig,
    default_mask: u64,
    owns_global: bool,
}

/// Builder for [`SignalTraps`]
pub struct SignalTrapsBuilder {
    native: Option<Box<dyn NativeSignals>>,
    pending: Option<&'static PendingSet>,
    state: Option<Arc<StateLock>>,
    config: TrapConfig,
}

impl SignalTrapsBuilder {
    pub fn with_native<N: NativeSignals + 'static>(mut self, native: N) -> Self {
        self.native = Some(Box::new(native));
        self
    }

    /// Pending set the native handler writes to
    ///
    /// Defaults to the process-wide set used by the sigaction backend.
    pub fn with_pending(mut self, pending: &'static PendingSet) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Share the host's global state lock
    pub fn with_state_lock(mut self, state: Arc<StateLock>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_config(mut self, config: TrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Build and run the default trap bootstrap if configured
    ///
    /// Only one instance at a time may use the process-wide pending set;
    /// a second one fails with [`TrapError::AlreadyOwned`].
    pub fn build(self) -> TrapResult<SignalTraps> {
        let pending = self.pending.unwrap_or(&PENDING);
        let owns_global = std::ptr::eq(pending, &PENDING);
        if owns_global
            && GLOBAL_OWNED
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Err(TrapError::AlreadyOwned);
        }

        let default_mask = if self.config.install_default_traps {
            bootstrap::default_mask()
        } else {
            0
        };
        let traps = SignalTraps {
            table: TrapTable::new(),
            state: self.state.unwrap_or_default(),
            native: self
                .native
                .unwrap_or_else(|| Box::new(NixSignals::new()) as Box<dyn NativeSignals>),
            pending,
            stats: AtomicTrapStats::new(),
            config: self.config,
            default_mask,
            owns_global,
        };

        if traps.config.install_default_traps {
            bootstrap::install_default_traps(&traps)?;
        }

        info!(
            default_traps = traps.config.install_default_traps,
            "Signal trap manager initialized"
        );
        Ok(traps)
    }
}

impl SignalTraps {
    pub fn builder() -> SignalTrapsBuilder {
        SignalTrapsBuilder {
            native: None,
            pending: None,
            state: None,
            config: TrapConfig::default(),
        }
    }

    /// sigaction backend, environment configuration
    pub fn new() -> TrapResult<Self> {
        Self::builder().with_config(TrapConfig::from_env()).build()
    }

    pub fn config(&self) -> &TrapConfig {
        &self.config
    }

    /// Resolve a signal identifier to a registered number
    pub fn resolve(&self, id: &SignalId) -> TrapResult<i32> {
        match id {
            SignalId::Number(n) => i32::try_from(*n)
                .ok()
                .filter(|n| registry::name_for(*n).is_some())
                .ok_or_else(|| TrapError::UnsupportedSignal(n.to_string())),
            SignalId::Name(name) => registry::number_for(name)
                .ok_or_else(|| TrapError::UnsupportedSignal(name.clone())),
        }
    }

    /// `trap(signal, handler)` / `trap(signal) { block }`
    ///
    /// Exactly one of `handler` and `block` must be given. Returns the action
    /// that was installed before, in the vocabulary accepted here.
    pub fn trap(
        &self,
        id: impl Into<SignalId>,
        handler: Option<ActionSpec>,
        block: Option<TrapHandler>,
    ) -> TrapResult<ActionSpec> {
        let spec = match (handler, block) {
            (Some(spec), None) => spec,
            (None, Some(block)) => ActionSpec::Handler(block),
            (None, None) => {
                return Err(TrapError::InvalidArgument("block must set".to_string()));
            }
            (Some(_), Some(_)) => {
                return Err(TrapError::InvalidArgument(
                    "wrong number of arguments (handler and block both given)".to_string(),
                ));
            }
        };

        let signo = self.resolve(&id.into())?;
        let previous = self.install(signo, spec.into())?;
        Ok(previous.into())
    }

    /// Two-argument form
    pub fn trap_with(&self, id: impl Into<SignalId>, spec: ActionSpec) -> TrapResult<ActionSpec> {
        self.trap(id, Some(spec), None)
    }

    /// Block form
    pub fn trap_block(
        &self,
        id: impl Into<SignalId>,
        block: TrapHandler,
    ) -> TrapResult<ActionSpec> {
        self.trap(id, None, Some(block))
    }

    /// Current action for a signal
    pub fn trap_action_for(&self, id: impl Into<SignalId>) -> TrapResult<ActionSpec> {
        let signo = self.resolve(&id.into())?;
        Ok(self.table.action_for(signo).into())
    }

    /// Whether `Default` raises an exception for this signal
    pub fn raises_by_default(&self, signo: i32) -> bool {
        signo > 0 && (signo as usize) < MAX_SIGNALS && self.default_mask & (1u64 << signo) != 0
    }

    fn install(&self, signo: i32, action: HandlerAction) -> TrapResult<HandlerAction> {
        let mut table = self.table.lock();
        let _state = self.state.state_lock();

        if registry::is_deliverable(signo) {
            let disposition = action.disposition(self.raises_by_default(signo));
            self.native.set_disposition(signo, disposition)?;
        }

        let previous = table.replace(signo, action);
        self.stats.inc_installed();
        info!(
            signal = signo,
            name = registry::name_for(signo).unwrap_or("?"),
            previous = ?previous,
            current = ?table.get(signo),
            "Installed trap"
        );
        Ok(previous)
    }

    /// Catch a default-trap signal natively
    ///
    /// Slots holding a trap are left alone. A signal inherited as ignored
    /// stays ignored, and the table records it. Returns whether the native
    /// handler was (re)installed.
    pub(super) fn install_default_trap(&self, signo: i32) -> TrapResult<bool> {
        let mut table = self.table.lock();
        let _state = self.state.state_lock();

        if *table.get(signo) != HandlerAction::Default {
            return Ok(false);
        }

        let inherited = self.native.set_disposition(signo, Disposition::Catch)?;
        if inherited == Disposition::Ignore {
            self.native.set_disposition(signo, Disposition::Ignore)?;
            table.replace(signo, HandlerAction::Ignore);
            debug!(signal = signo, "Keeping inherited ignore disposition");
            return Ok(false);
        }
        Ok(true)
    }

    /// `Signal.reset!`: re-run the default trap bootstrap
    ///
    /// Re-catches default-trap signals still at `Default`, for instance after
    /// native code replaced their dispositions. Installed traps are kept.
    pub fn reset_default_traps(&self) -> TrapResult<usize> {
        if !self.config.install_default_traps {
            return Ok(0);
        }

        let reset = bootstrap::install_default_traps(self)?;
        info!(count = reset, "Reset default traps");
        Ok(reset)
    }

    /// Run the EXIT trap once, clearing it first
    ///
    /// Returns whether a handler ran.
    pub fn run_exit_trap(&self) -> anyhow::Result<bool> {
        let action = {
            let mut table = self.table.lock();
            let _state = self.state.state_lock();
            match table.get(EXIT) {
                HandlerAction::Callable(_) => table.take(EXIT),
                _ => return Ok(false),
            }
        };

        if let HandlerAction::Callable(handler) = action {
            debug!(handler = handler.id(), "Running exit trap");
            self.stats.inc_handlers_invoked();
            handler.call()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Dispatch every pending signal in ascending order
    ///
    /// Repeated deliveries of one signal before this point collapse into a
    /// single dispatch. An exception stops the drain; signals not yet reached
    /// stay pending for the next safe point.
    pub fn drain(&self) -> anyhow::Result<usize> {
        if !self.pending.any() {
            return Ok(0);
        }
        self.stats.inc_drains();

        let pending = self.pending.snapshot();
        let span = DrainSpan::new(pending.len());
        let _entered = span.enter();

        let mut dispatched = 0;
        for signo in pending {
            if !self.pending.take(signo) {
                continue;
            }
            dispatched += 1;
            match self.dispatch(signo) {
                Ok(outcome) => debug!(signal = signo, outcome = ?outcome, "Dispatched signal"),
                Err(e) => {
                    span.record_dispatched(dispatched);
                    if let Some(exc) = e.downcast_ref::<SignalException>() {
                        span.record_raised(exc.class_name());
                    }
                    return Err(e);
                }
            }
        }
        span.record_dispatched(dispatched);
        Ok(dispatched)
    }

    /// Run the installed action for one signal in interpreter context
    pub fn dispatch(&self, signo: i32) -> anyhow::Result<DispatchOutcome> {
        let action = {
            let table = self.table.lock();
            let _state = self.state.state_lock();
            table.get(signo).clone()
        };
        self.stats.inc_dispatched();

        match action {
            HandlerAction::Default => match self.default_exception(signo) {
                Some(exc) => {
                    self.stats.inc_exceptions_raised();
                    info!(
                        signal = signo,
                        exception = exc.class_name(),
                        "Raising default signal exception"
                    );
                    Err(exc.into())
                }
                None => {
                    warn!(signal = signo, "No default exception for signal");
                    Ok(DispatchOutcome::Unhandled)
                }
            },
            HandlerAction::Ignore => {
                self.stats.inc_ignored();
                Ok(DispatchOutcome::Ignored)
            }
            HandlerAction::Callable(handler) => {
                self.stats.inc_handlers_invoked();
                handler.call()?;
                Ok(DispatchOutcome::HandlerInvoked(handler.id()))
            }
        }
    }

    /// Exception raised when a default trap fires
    pub fn default_exception(&self, signo: i32) -> Option<SignalException> {
        if !self.raises_by_default(signo) {
            return None;
        }
        bootstrap::default_exception(signo, &self.config)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.any()
    }

    /// Pending signal numbers, ascending
    pub fn pending(&self) -> Vec<i32> {
        self.pending.snapshot()
    }

    pub fn signal_list(&self) -> BTreeMap<String, i32> {
        registry::signal_list()
    }

    pub fn signal_name(&self, signo: i32) -> Option<&'static str> {
        registry::name_for(signo)
    }

    pub fn state_lock(&self) -> StateGuard<'_> {
        self.state.state_lock()
    }

    pub fn state_unlock(&self, guard: StateGuard<'_>) {
        self.state.state_unlock(guard)
    }

    /// Shared handle to the state lock
    pub fn state(&self) -> Arc<StateLock> {
        self.state.clone()
    }

    pub fn stats(&self) -> TrapStats {
        self.stats.snapshot(self.pending.received())
    }
}

impl Drop for SignalTraps {
    fn drop(&mut self) {
        if self.owns_global {
            GLOBAL_OWNED.store(false, Ordering::Release);
        }
    }
}

impl SafePoint for SignalTraps {
    fn has_pending(&self) -> bool {
        self.pending.any()
    }

    fn run_pending(&self) -> anyhow::Result<usize> {
        self.drain()
    }
}

/*!
 * Signal Trap Tests
 * Installation, dispatch and default-trap behavior against an in-memory OS
 */

use nix::libc;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use signal_trap::signals::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory stand-in for sigaction; KILL and STOP are refused like the OS does
#[derive(Default)]
struct FakeOs {
    dispositions: Mutex<HashMap<i32, Disposition>>,
}

impl FakeOs {
    fn disposition(&self, signo: i32) -> Disposition {
        self.dispositions
            .lock()
            .get(&signo)
            .copied()
            .unwrap_or(Disposition::System)
    }
}

struct SharedOs(Arc<FakeOs>);

impl NativeSignals for SharedOs {
    fn set_disposition(&self, signo: i32, d: Disposition) -> TrapResult<Disposition> {
        if signo == libc::SIGKILL || signo == libc::SIGSTOP {
            return Err(TrapError::NativeRegistration {
                signal: name_for(signo).unwrap().to_string(),
                reason: "Invalid argument".to_string(),
            });
        }
        Ok(self
            .0
            .dispositions
            .lock()
            .insert(signo, d)
            .unwrap_or(Disposition::System))
    }
}

struct Harness {
    traps: SignalTraps,
    os: Arc<FakeOs>,
    pending: &'static PendingSet,
}

impl Harness {
    fn with_config(config: TrapConfig) -> Self {
        let os = Arc::new(FakeOs::default());
        let pending: &'static PendingSet = Box::leak(Box::new(PendingSet::new()));
        let traps = SignalTraps::builder()
            .with_native(SharedOs(os.clone()))
            .with_pending(pending)
            .with_config(config)
            .build()
            .unwrap();
        Self { traps, os, pending }
    }

    fn new() -> Self {
        Self::with_config(TrapConfig::default())
    }

    /// Simulate OS delivery into the dispatcher
    fn deliver(&self, signo: i32) {
        assert_eq!(
            self.os.disposition(signo),
            Disposition::Catch,
            "signal {} is not caught natively",
            signo
        );
        self.pending.mark(signo);
    }
}

fn counting_handler() -> (TrapHandler, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let handler = TrapHandler::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (handler, count)
}

fn sym(name: &str) -> SignalId {
    SignalId::try_from(SignalArg::Symbol(name.to_string())).unwrap()
}

fn token(t: &str) -> ActionSpec {
    ActionSpec::from_token(t).unwrap()
}

// =============================================================================
// Installation API
// =============================================================================

#[test]
fn test_kernel_trap_round_trip() {
    let h = Harness::new();
    let block = TrapHandler::new(|| Ok(()));

    assert_eq!(h.traps.trap_with(sym("HUP"), token("SIG_DFL")).unwrap(), ActionSpec::Default);
    assert_eq!(h.traps.trap_block(sym("HUP"), block.clone()).unwrap(), ActionSpec::Default);
    assert_eq!(
        h.traps.trap_with(sym("HUP"), block.clone().into()).unwrap(),
        ActionSpec::Handler(block.clone())
    );
    assert!(matches!(
        h.traps.trap(sym("HUP"), None, None),
        Err(TrapError::InvalidArgument(_))
    ));
    assert_eq!(
        h.traps.trap_with(sym("HUP"), token("SIG_DFL")).unwrap(),
        ActionSpec::Handler(block)
    );
}

#[test]
fn test_signal_trap_save_and_restore() {
    let h = Harness::new();
    let (pr, _count) = counting_handler();

    let saved = h.traps.trap_with(sym("HUP"), pr.clone().into()).unwrap();
    assert_eq!(h.traps.trap_with(sym("HUP"), saved.clone()).unwrap(), ActionSpec::Handler(pr.clone()));

    h.traps.trap_with(sym("HUP"), token("SIG_DFL")).unwrap();
    assert_eq!(h.traps.trap_with(sym("HUP"), token("SIG_DFL")).unwrap(), ActionSpec::Default);

    h.traps.trap_with(sym("SIGHUP"), pr.clone().into()).unwrap();
    assert_eq!(h.traps.trap_with(sym("HUP"), saved).unwrap(), ActionSpec::Handler(pr));
}

#[test]
fn test_restored_default_raises_again() {
    let h = Harness::new();
    let (handler, count) = counting_handler();

    let saved = h.traps.trap_block("HUP", handler).unwrap();
    assert_eq!(saved, ActionSpec::Default);
    h.traps.trap_with("HUP", saved).unwrap();

    h.deliver(libc::SIGHUP);
    let err = h.traps.drain().unwrap_err();
    let exc = err.downcast_ref::<SignalException>().unwrap();
    assert_eq!(exc.signal_number(), libc::SIGHUP);
    assert_eq!(exc.display_name(), "SIGHUP");
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_restored_handler_runs_again() {
    let h = Harness::new();
    let (first, first_count) = counting_handler();
    let (second, second_count) = counting_handler();

    h.traps.trap_block("USR2", first).unwrap();
    let saved = h.traps.trap_block("USR2", second).unwrap();
    h.traps.trap_with("USR2", saved).unwrap();

    h.deliver(libc::SIGUSR2);
    assert_eq!(h.traps.drain().unwrap(), 1);
    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_ignore_then_default_returns_ignore() {
    let h = Harness::new();
    h.traps.trap_with("TERM", ActionSpec::Ignore).unwrap();
    assert_eq!(h.os.disposition(libc::SIGTERM), Disposition::Ignore);

    let prev = h.traps.trap_with("TERM", ActionSpec::Default).unwrap();
    assert_eq!(prev, ActionSpec::Ignore);
    assert_eq!(h.os.disposition(libc::SIGTERM), Disposition::Catch);
}

#[test]
fn test_exit_pseudo_signal() {
    let h = Harness::new();
    assert_eq!(
        h.traps.trap_block(0, TrapHandler::new(|| Ok(()))).unwrap(),
        ActionSpec::Default
    );
    h.traps.trap_with(0, token("SIG_DFL")).unwrap();
    assert_eq!(
        h.traps.trap_block("EXIT", TrapHandler::new(|| Ok(()))).unwrap(),
        ActionSpec::Default
    );
}

#[test]
fn test_unsupported_signals() {
    let h = Harness::new();
    assert!(matches!(
        h.traps.trap_with(-1, ActionSpec::Ignore),
        Err(TrapError::UnsupportedSignal(_))
    ));
    assert!(matches!(
        h.traps.trap_with("NOPE", ActionSpec::Ignore),
        Err(TrapError::UnsupportedSignal(_))
    ));
    assert!(matches!(
        h.traps.trap_with(SignalId::Number(1 << 40), ActionSpec::Ignore),
        Err(TrapError::UnsupportedSignal(_))
    ));
}

#[test]
fn test_query_form_without_handler_fails() {
    let h = Harness::new();
    let err = h.traps.trap(-1, None, None).unwrap_err();
    assert!(matches!(err, TrapError::InvalidArgument(_)));

    let err = h.traps.trap("USR1", None, None).unwrap_err();
    assert_eq!(err, TrapError::InvalidArgument("block must set".to_string()));
}

#[test]
fn test_handler_and_block_together_fail() {
    let h = Harness::new();
    let err = h
        .traps
        .trap("USR1", Some(ActionSpec::Ignore), Some(TrapHandler::new(|| Ok(()))))
        .unwrap_err();
    assert!(matches!(err, TrapError::InvalidArgument(_)));
    assert_eq!(h.traps.trap_action_for("USR1").unwrap(), ActionSpec::Default);
}

#[test]
fn test_wrong_type_identifier() {
    let err = SignalId::try_from(SignalArg::Other("Float".to_string())).unwrap_err();
    assert!(matches!(err, TrapError::WrongType(_)));
}

#[test]
fn test_native_failure_leaves_table_unchanged() {
    let h = Harness::new();
    let err = h.traps.trap_with("KILL", ActionSpec::Ignore).unwrap_err();
    assert!(matches!(err, TrapError::NativeRegistration { .. }));
    assert_eq!(h.traps.trap_action_for("KILL").unwrap(), ActionSpec::Default);
}

#[test]
fn test_trap_action_for() {
    let h = Harness::new();
    let (handler, _) = counting_handler();
    h.traps.trap_block("USR2", handler.clone()).unwrap();
    assert_eq!(
        h.traps.trap_action_for(libc::SIGUSR2).unwrap(),
        ActionSpec::Handler(handler)
    );
    assert_eq!(h.traps.trap_action_for("WINCH").unwrap(), ActionSpec::Default);
}

#[test]
fn test_callable_enables_native_catching() {
    let h = Harness::with_config(TrapConfig::bare());
    assert_eq!(h.os.disposition(libc::SIGWINCH), Disposition::System);
    h.traps.trap_block("WINCH", TrapHandler::new(|| Ok(()))).unwrap();
    assert_eq!(h.os.disposition(libc::SIGWINCH), Disposition::Catch);
    h.traps.trap_with("WINCH", ActionSpec::Default).unwrap();
    assert_eq!(h.os.disposition(libc::SIGWINCH), Disposition::System);
}

// =============================================================================
// Registry surface
// =============================================================================

#[test]
fn test_signal_list() {
    let list = signal_list();
    assert!(!list.is_empty());
    assert_eq!(list.get("HUP"), Some(&libc::SIGHUP));
    assert_eq!(list.get("EXIT"), Some(&0));
}

#[test]
fn test_signame() {
    assert_eq!(signal_name(libc::SIGHUP), Some("HUP"));
    assert_eq!(signal_name(libc::SIGINT), Some("INT"));
    assert_eq!(signal_name(libc::SIGQUIT), Some("QUIT"));
    assert_eq!(signal_name(-1), None);
}

// =============================================================================
// Exceptions
// =============================================================================

#[test]
fn test_signal_exception_from_hup() {
    let exc = SignalException::new(1).unwrap();
    assert_eq!(exc.signal_number(), 1);
    assert_eq!(exc.display_name(), "SIGHUP");
}

#[test]
fn test_signal_exception_invalid() {
    assert!(matches!(
        SignalException::new(-1),
        Err(TrapError::InvalidArgument(_))
    ));
    assert!(matches!(
        SignalException::new(SignalArg::Other("Float".to_string())),
        Err(TrapError::WrongType(_))
    ));
}

// =============================================================================
// Deferred delivery
// =============================================================================

#[test]
fn test_callable_runs_once_per_drain() {
    let h = Harness::new();
    let (handler, count) = counting_handler();
    h.traps.trap_block("HUP", handler).unwrap();

    h.deliver(libc::SIGHUP);
    h.deliver(libc::SIGHUP);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    assert_eq!(h.traps.drain().unwrap(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    assert_eq!(h.traps.drain().unwrap(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ignore_is_noop() {
    let h = Harness::new();
    h.traps.trap_with("USR1", ActionSpec::Ignore).unwrap();
    h.pending.mark(libc::SIGUSR1);
    assert_eq!(h.traps.dispatch(libc::SIGUSR1).unwrap(), DispatchOutcome::Ignored);
    assert_eq!(h.traps.drain().unwrap(), 1);
    assert_eq!(h.traps.stats().signals_ignored, 2);
}

#[test]
fn test_ascending_order_within_drain() {
    let h = Harness::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for signo in [libc::SIGTERM, libc::SIGHUP, libc::SIGUSR2, libc::SIGUSR1] {
        let order = order.clone();
        h.traps
            .trap_block(signo, TrapHandler::new(move || {
                order.lock().push(signo);
                Ok(())
            }))
            .unwrap();
    }

    for signo in [libc::SIGUSR2, libc::SIGTERM, libc::SIGHUP, libc::SIGUSR1] {
        h.deliver(signo);
    }

    assert_eq!(h.traps.drain().unwrap(), 4);
    let mut expected = vec![libc::SIGTERM, libc::SIGHUP, libc::SIGUSR2, libc::SIGUSR1];
    expected.sort_unstable();
    assert_eq!(*order.lock(), expected);
}

#[test]
fn test_handler_error_stops_drain_and_keeps_rest_pending() {
    let h = Harness::new();
    h.traps
        .trap_block("HUP", TrapHandler::new(|| anyhow::bail!("boom")))
        .unwrap();
    let (handler, count) = counting_handler();
    h.traps.trap_block("USR2", handler).unwrap();

    h.deliver(libc::SIGHUP);
    h.deliver(libc::SIGUSR2);

    let err = h.traps.drain().unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(h.traps.pending(), vec![libc::SIGUSR2]);

    assert_eq!(h.traps.drain().unwrap(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replaced_handler_sees_new_action() {
    let h = Harness::new();
    let (first, first_count) = counting_handler();
    let (second, second_count) = counting_handler();

    h.traps.trap_block("USR1", first).unwrap();
    h.deliver(libc::SIGUSR1);
    h.traps.trap_block("USR1", second).unwrap();
    h.traps.drain().unwrap();

    assert_eq!(first_count.load(Ordering::SeqCst), 0);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Default traps
// =============================================================================

#[test]
fn test_uncaught_int_raises_interrupt() {
    let h = Harness::new();
    h.deliver(libc::SIGINT);

    let err = h.traps.drain().unwrap_err();
    let exc = err.downcast_ref::<SignalException>().unwrap();
    assert!(exc.is_interrupt());
    assert_eq!(exc.signal_number(), libc::SIGINT);
    assert_eq!(exc.message(), INTERRUPT_MESSAGE);
}

#[test]
fn test_uncaught_term_raises_signal_exception() {
    let h = Harness::new();
    h.deliver(libc::SIGTERM);

    let err = h.traps.drain().unwrap_err();
    let exc = err.downcast_ref::<SignalException>().unwrap();
    assert!(!exc.is_interrupt());
    assert_eq!(exc.signal_number(), number_for("TERM").unwrap());
    assert_eq!(exc.display_name(), "SIGTERM");
}

#[test]
fn test_every_default_trap_raises() {
    let h = Harness::new();
    for signo in default_trap_numbers() {
        assert_eq!(h.os.disposition(signo), Disposition::Catch);
        h.deliver(signo);
        let err = h.traps.drain().unwrap_err();
        let exc = err.downcast_ref::<SignalException>().unwrap();
        assert_eq!(exc.signal_number(), signo);
    }
    assert_eq!(h.traps.stats().exceptions_raised, DEFAULT_TRAPS.len() as u64);
}

#[test]
fn test_other_signals_keep_os_default() {
    let h = Harness::new();
    assert_eq!(h.os.disposition(libc::SIGPIPE), Disposition::System);
    assert_eq!(h.os.disposition(libc::SIGSEGV), Disposition::System);
    assert_eq!(h.traps.dispatch(libc::SIGPIPE).unwrap(), DispatchOutcome::Unhandled);
}

#[test]
fn test_custom_interrupt_message() {
    let h = Harness::with_config(TrapConfig::default().with_interrupt_message("^C"));
    h.deliver(libc::SIGINT);
    let err = h.traps.drain().unwrap_err();
    assert_eq!(err.downcast_ref::<SignalException>().unwrap().message(), "^C");
}

#[test]
fn test_reset_default_traps_keeps_installed_traps() {
    let h = Harness::new();
    let (handler, count) = counting_handler();
    h.traps.trap_with("INT", ActionSpec::Ignore).unwrap();
    h.traps.trap_block("TERM", handler.clone()).unwrap();

    // Native code outside the trap API resets HUP to the OS default
    h.os.dispositions
        .lock()
        .insert(libc::SIGHUP, Disposition::System);

    assert_eq!(h.traps.reset_default_traps().unwrap(), DEFAULT_TRAPS.len() - 2);
    assert_eq!(h.traps.trap_action_for("INT").unwrap(), ActionSpec::Ignore);
    assert_eq!(h.traps.trap_action_for("TERM").unwrap(), ActionSpec::Handler(handler));
    assert_eq!(h.os.disposition(libc::SIGINT), Disposition::Ignore);
    assert_eq!(h.os.disposition(libc::SIGHUP), Disposition::Catch);

    h.deliver(libc::SIGTERM);
    assert_eq!(h.traps.drain().unwrap(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    h.deliver(libc::SIGHUP);
    let err = h.traps.drain().unwrap_err();
    assert_eq!(
        err.downcast_ref::<SignalException>().unwrap().signal_number(),
        libc::SIGHUP
    );
}

#[test]
fn test_reset_without_defaults_is_noop() {
    let h = Harness::with_config(TrapConfig::bare());
    assert_eq!(h.traps.reset_default_traps().unwrap(), 0);
}

// =============================================================================
// Exit trap
// =============================================================================

#[test]
fn test_exit_trap_runs_once() {
    let h = Harness::new();
    let (handler, count) = counting_handler();
    h.traps.trap_block("EXIT", handler).unwrap();

    assert!(h.traps.run_exit_trap().unwrap());
    assert!(!h.traps.run_exit_trap().unwrap());
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(h.traps.trap_action_for(0).unwrap(), ActionSpec::Default);
}

#[test]
fn test_exit_trap_absent() {
    let h = Harness::new();
    assert!(!h.traps.run_exit_trap().unwrap());
}

// =============================================================================
// Safe-point hook and locking
// =============================================================================

#[test]
fn test_safe_point_hook() {
    let h = Harness::new();
    let (handler, count) = counting_handler();
    h.traps.trap_block("USR1", handler).unwrap();
    let pending = h.pending;
    let hook = SafePointHook::new(Arc::new(h.traps));

    assert_eq!(hook.check().unwrap(), 0);
    pending.mark(libc::SIGUSR1);
    assert!(hook.traps().has_pending());
    assert_eq!(hook.check().unwrap(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(hook.checks(), 2);
}

#[test]
fn test_concurrent_install_and_drain() {
    let h = Arc::new(Harness::new());
    let (handler, count) = counting_handler();
    h.traps.trap_block("USR1", handler.clone()).unwrap();

    let installer = {
        let h = h.clone();
        std::thread::spawn(move || {
            for i in 0..200 {
                let spec = if i % 2 == 0 {
                    ActionSpec::Ignore
                } else {
                    ActionSpec::Handler(handler.clone())
                };
                h.traps.trap_with("USR1", spec).unwrap();
            }
        })
    };

    for _ in 0..200 {
        h.pending.mark(libc::SIGUSR1);
        h.traps.drain().unwrap();
    }
    installer.join().unwrap();

    assert!(count.load(Ordering::SeqCst) <= 200);
    assert!(matches!(
        h.traps.trap_action_for("USR1").unwrap(),
        ActionSpec::Handler(_)
    ));
}

#[test]
fn test_host_state_lock_blocks_dispatch() {
    let h = Arc::new(Harness::new());
    let (handler, count) = counting_handler();
    h.traps.trap_block("USR1", handler).unwrap();
    h.pending.mark(libc::SIGUSR1);

    let guard = h.traps.state_lock();
    let drainer = {
        let h = h.clone();
        std::thread::spawn(move || h.traps.drain().unwrap())
    };
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    h.traps.state_unlock(guard);

    assert_eq!(drainer.join().unwrap(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stats_follow_drains() {
    let h = Harness::new();
    let (handler, _) = counting_handler();
    h.traps.trap_block("USR1", handler).unwrap();
    let before = h.traps.stats();

    h.deliver(libc::SIGUSR1);
    h.deliver(libc::SIGUSR1);
    h.traps.drain().unwrap();

    let after = h.traps.stats();
    assert_eq!(after.signals_received, 2);
    assert_eq!(after.signals_dispatched, before.signals_dispatched + 1);
    assert_eq!(after.handlers_invoked, before.handlers_invoked + 1);
    assert_eq!(after.drains, before.drains + 1);
    assert!(after.traps_installed >= 1);
}

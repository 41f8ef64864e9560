/*!
 * Signal Trap Demo Host
 *
 * Toy interpreter loop that:
 * - Bootstraps the default traps
 * - Installs a USR1 handler and an EXIT hook
 * - Drains pending signals at every safe point
 * - Stops on the first uncaught signal exception
 */

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use signal_trap::{init_tracing, SafePointHook, SignalException, SignalTraps, TrapHandler};

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    info!(pid = std::process::id(), "Signal trap demo host starting");

    let traps = Arc::new(SignalTraps::new()?);
    let hook = SafePointHook::new(traps.clone());

    let usr1_count = Arc::new(AtomicU64::new(0));
    let counter = usr1_count.clone();
    traps.trap_block(
        "USR1",
        TrapHandler::new(move || {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            info!(count = n, "USR1 trapped");
            Ok(())
        }),
    )?;

    traps.trap_block(
        "EXIT",
        TrapHandler::new(|| {
            info!("Exit trap running");
            Ok(())
        }),
    )?;

    info!("Send USR1 to count, INT or TERM to stop");

    let mut instructions: u64 = 0;
    let outcome = loop {
        // One "instruction"
        std::thread::sleep(Duration::from_millis(50));
        instructions += 1;

        if let Err(e) = hook.check() {
            break e;
        }
    };

    match outcome.downcast_ref::<SignalException>() {
        Some(exc) if exc.is_interrupt() => info!(message = exc.message(), "Interrupted"),
        Some(exc) => warn!(
            signal = exc.signal_number(),
            name = exc.display_name(),
            "Terminated by signal"
        ),
        None => error!(error = %outcome, "Handler raised"),
    }

    traps.run_exit_trap()?;

    let stats = traps.stats();
    info!(
        instructions,
        usr1 = usr1_count.load(Ordering::Relaxed),
        safe_points = hook.checks(),
        "Demo host finished"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

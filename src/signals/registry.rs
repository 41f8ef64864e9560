/*!
 * Signal Registry
 * Fixed name <-> number table for the host platform
 */

use ahash::{HashMap, HashMapExt};
use nix::libc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Conventional prefix stripped from signal names before lookup
pub const SIG_PREFIX: &str = "SIG";

/// Pseudo-signal run at process exit; never registered with the OS
pub const EXIT: i32 = 0;

/// Upper bound (exclusive) on signal numbers tracked by the trap table
pub const MAX_SIGNALS: usize = 64;

/// Immutable signal name/number pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SignalDescriptor {
    pub name: &'static str,
    pub number: i32,
}

const fn sig(name: &'static str, number: libc::c_int) -> SignalDescriptor {
    SignalDescriptor { name, number }
}

static SIGNALS: &[SignalDescriptor] = &[
    sig("EXIT", EXIT),
    sig("HUP", libc::SIGHUP),
    sig("INT", libc::SIGINT),
    sig("QUIT", libc::SIGQUIT),
    sig("ILL", libc::SIGILL),
    sig("TRAP", libc::SIGTRAP),
    sig("ABRT", libc::SIGABRT),
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    sig("EMT", libc::SIGEMT),
    sig("FPE", libc::SIGFPE),
    sig("KILL", libc::SIGKILL),
    sig("BUS", libc::SIGBUS),
    sig("SEGV", libc::SIGSEGV),
    sig("SYS", libc::SIGSYS),
    sig("PIPE", libc::SIGPIPE),
    sig("ALRM", libc::SIGALRM),
    sig("TERM", libc::SIGTERM),
    sig("URG", libc::SIGURG),
    sig("STOP", libc::SIGSTOP),
    sig("TSTP", libc::SIGTSTP),
    sig("CONT", libc::SIGCONT),
    sig("CHLD", libc::SIGCHLD),
    sig("TTIN", libc::SIGTTIN),
    sig("TTOU", libc::SIGTTOU),
    sig("IO", libc::SIGIO),
    sig("XCPU", libc::SIGXCPU),
    sig("XFSZ", libc::SIGXFSZ),
    sig("VTALRM", libc::SIGVTALRM),
    sig("PROF", libc::SIGPROF),
    sig("WINCH", libc::SIGWINCH),
    sig("USR1", libc::SIGUSR1),
    sig("USR2", libc::SIGUSR2),
    #[cfg(any(target_os = "linux", target_os = "android"))]
    sig("PWR", libc::SIGPWR),
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    sig("INFO", libc::SIGINFO),
];

/// Alternate spellings sharing a number with a canonical entry
static ALIASES: &[(&str, &str)] = &[
    ("IOT", "ABRT"),
    ("CLD", "CHLD"),
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ("POLL", "IO"),
];

struct Index {
    by_name: HashMap<&'static str, i32>,
    by_number: HashMap<i32, &'static str>,
}

fn index() -> &'static Index {
    static INDEX: OnceLock<Index> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut by_name = HashMap::with_capacity(SIGNALS.len() + ALIASES.len());
        let mut by_number = HashMap::with_capacity(SIGNALS.len());
        for desc in SIGNALS {
            by_name.insert(desc.name, desc.number);
            by_number.insert(desc.number, desc.name);
        }
        for (alias, canonical) in ALIASES {
            if let Some(&number) = by_name.get(canonical) {
                by_name.insert(*alias, number);
            }
        }
        Index {
            by_name,
            by_number,
        }
    })
}

/// Strip the conventional prefix and upper-case a signal name
pub fn normalize(name: &str) -> String {
    let upper = name.to_ascii_uppercase();
    match upper.strip_prefix(SIG_PREFIX) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => upper,
    }
}

/// Look up a signal number by name
///
/// Accepts canonical names and aliases, with or without the `SIG` prefix.
pub fn number_for(name: &str) -> Option<i32> {
    index().by_name.get(normalize(name).as_str()).copied()
}

/// Look up the canonical name for a signal number
pub fn name_for(number: i32) -> Option<&'static str> {
    index().by_number.get(&number).copied()
}

/// Every registered signal, in stable order
pub fn all() -> &'static [SignalDescriptor] {
    SIGNALS
}

/// Snapshot of the registry as name -> number
pub fn signal_list() -> BTreeMap<String, i32> {
    SIGNALS
        .iter()
        .map(|desc| (desc.name.to_string(), desc.number))
        .collect()
}

/// Check that a number names a real, OS-deliverable signal
pub fn is_deliverable(number: i32) -> bool {
    number != EXIT && name_for(number).is_some()
}

/*!
 * Structured Tracing
 * Subscriber setup and spans for safe-point drains
 */

use std::time::Instant;
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Handlers running longer than this are reported as slow
const SLOW_DRAIN_MS: u128 = 10;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SIGNAL_TRAP_LOG_JSON: Enable JSON output (default: false)
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("SIGNAL_TRAP_LOG_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        debug!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering one safe-point drain
pub struct DrainSpan {
    span: tracing::Span,
    start: Instant,
}

impl DrainSpan {
    pub fn new(pending: usize) -> Self {
        let span = span!(
            Level::DEBUG,
            "drain",
            pending = pending,
            dispatched = tracing::field::Empty,
            raised = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn record_dispatched(&self, count: usize) {
        self.span.record("dispatched", count);
    }

    pub fn record_raised(&self, class_name: &str) {
        self.span.record("raised", class_name);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for DrainSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();
        if elapsed.as_millis() > SLOW_DRAIN_MS {
            warn!(
                duration_ms = elapsed.as_millis(),
                slow = true,
                "slow signal drain"
            );
        } else {
            debug!(duration_us = elapsed.as_micros(), "signal drain completed");
        }
    }
}

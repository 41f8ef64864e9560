/*!
 * Monitoring
 * Structured logging for the trap subsystem
 */

mod tracer;

pub use tracer::{init_tracing, DrainSpan};

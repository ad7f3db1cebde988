/*!
 * Monitoring
 * Structured tracing for dispatch batches
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, DispatchSpan};

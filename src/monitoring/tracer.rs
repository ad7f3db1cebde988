/*!
 * Tracing
 * Structured logging setup and dispatch spans using the tracing crate
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Dispatches slower than this are logged at warn level
const SLOW_DISPATCH: Duration = Duration::from_secs(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KERNEL_SYNC_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("KERNEL_SYNC_TRACE_JSON")
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
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique trace ID for correlating one dispatch's log lines
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one fan-out/join batch
///
/// Logs the outcome with timing when dropped.
pub struct DispatchSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
    tasks: usize,
    failed: Option<usize>,
}

impl DispatchSpan {
    pub fn new(tasks: usize) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "dispatch",
            trace_id = %trace_id,
            tasks = tasks,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
            tasks,
            failed: None,
        }
    }

    /// Get the trace ID for this dispatch
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Enter the span on the calling thread
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Parent handle for spans created on worker threads
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Record the number of tasks that failed or never started
    pub fn record_failures(&mut self, failed: usize) {
        self.failed = Some(failed);
        self.span
            .record("result", if failed == 0 { "success" } else { "error" });
    }
}

impl Drop for DispatchSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        let failed = self.failed.unwrap_or(0);
        if duration > SLOW_DISPATCH {
            warn!(
                trace_id = %self.trace_id,
                tasks = self.tasks,
                failed,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow dispatch"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                tasks = self.tasks,
                failed,
                duration_us = duration.as_micros() as u64,
                "dispatch span closed"
            );
        }
    }
}

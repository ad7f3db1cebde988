/*!
 * Kernel Sync Library
 *
 * Thread-coordination building blocks:
 * - Fan-out/join worker dispatch
 * - Single-value handoff between producer and consumer
 * - Lock-free shared counters
 */

pub mod core;
pub mod dispatch;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{SyncError, SyncResult};
pub use crate::core::sync::{
    AtomicAccumulator, HandoffChannel, HandoffError, HandoffResult, HandoffState,
};
pub use dispatch::{
    dispatch, DispatchConfig, DispatchFailure, DispatchResult, FailureCause, NotStarted,
    StartRefusal, Task, TaskId, TaskResult, WorkerDispatcher, WorkerFailure,
};
pub use monitoring::init_tracing;

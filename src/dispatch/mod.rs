/*!
 * Worker Dispatch
 *
 * Bounded fan-out/join: one OS thread per task, a join barrier before
 * returning, and a collected failure report instead of process exit.
 *
 * # Architecture
 *
 * - `Task`: entry point plus the payload it owns
 * - `WorkerDispatcher`: spawns the batch on scoped threads and joins it
 * - `DispatchFailure`: per-task detail for every worker that failed or
 *   never started
 */

mod config;
mod dispatcher;
mod task;
mod types;

pub use config::{DispatchConfig, ENV_MAX_WORKERS, ENV_STACK_SIZE};
pub use dispatcher::{dispatch, WorkerDispatcher};
pub use task::Task;
pub use types::{
    DispatchFailure, DispatchResult, FailureCause, NotStarted, StartRefusal, TaskId, TaskResult,
    WorkerFailure,
};

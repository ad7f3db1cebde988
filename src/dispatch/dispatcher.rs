/*!
 * Worker Dispatcher
 *
 * Fan-out/join over scoped OS threads. One call owns the whole lifecycle:
 * spawn every task, join every worker, collect every failure.
 */

use super::config::DispatchConfig;
use super::task::Task;
use super::types::{
    DispatchFailure, DispatchResult, FailureCause, NotStarted, StartRefusal, TaskId, TaskResult,
    WorkerFailure,
};
use crate::monitoring::DispatchSpan;
use std::any::Any;
use std::thread::{self, Builder, Scope, ScopedJoinHandle};
use tracing::{debug, info, warn};

/// Runs a batch of tasks on one thread each and waits for all of them
///
/// # Limitations
///
/// There is no cancellation: a worker that never returns makes `dispatch`
/// block forever.
#[derive(Debug, Clone, Default)]
pub struct WorkerDispatcher {
    config: DispatchConfig,
}

impl WorkerDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Start every task and block until all started workers have terminated
    ///
    /// Returns `Ok(())` only if every task started and returned `Ok`. Otherwise
    /// the failure lists each worker that errored or panicked and each task
    /// that never got a thread. A thread creation failure stops the batch:
    /// the remaining tasks are reported as not started, never run on fewer
    /// workers.
    pub fn dispatch(&self, tasks: Vec<Task<'_>>) -> DispatchResult<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let mut span = DispatchSpan::new(tasks.len());
        let failure = {
            let _entered = span.enter();
            self.run_batch(&span, tasks)
        };
        span.record_failures(failure.len());

        if failure.is_empty() {
            Ok(())
        } else {
            Err(failure)
        }
    }

    fn run_batch(&self, span: &DispatchSpan, tasks: Vec<Task<'_>>) -> DispatchFailure {
        let requested = tasks.len();

        if let Some(limit) = self.config.max_workers {
            if requested > limit {
                warn!(limit, requested, "batch exceeds worker limit; nothing started");
                let reason = StartRefusal::WorkerLimit { limit, requested };
                return DispatchFailure {
                    failed: Vec::new(),
                    not_started: refuse_all(tasks.into_iter().enumerate(), &reason),
                };
            }
        }

        let failure = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(requested);
            let mut not_started = Vec::new();
            let mut pending = tasks.into_iter().enumerate();

            while let Some((index, task)) = pending.next() {
                let (label, entry) = task.into_parts();
                let id = TaskId { index, label };

                match self.spawn(scope, span, &id, entry) {
                    Ok(handle) => {
                        debug!(task = %id, "worker spawned");
                        handles.push((id, handle));
                    }
                    Err(e) => {
                        warn!(task = %id, error = %e, "failed to spawn worker; aborting dispatch");
                        let reason = StartRefusal::Spawn {
                            detail: e.to_string(),
                        };
                        not_started.push(NotStarted {
                            task: id,
                            reason: reason.clone(),
                        });
                        not_started.extend(refuse_all(pending.by_ref(), &reason));
                        break;
                    }
                }
            }

            // Join barrier: every started worker terminates before we return
            let failed = handles
                .into_iter()
                .filter_map(|(id, handle)| join_worker(id, handle))
                .collect();

            DispatchFailure {
                failed,
                not_started,
            }
        });

        info!(
            tasks = requested,
            failed = failure.failed.len(),
            not_started = failure.not_started.len(),
            "dispatch complete"
        );
        failure
    }

    fn spawn<'scope, 'env>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        span: &DispatchSpan,
        id: &TaskId,
        entry: Box<dyn FnOnce() -> TaskResult + Send + 'env>,
    ) -> std::io::Result<ScopedJoinHandle<'scope, TaskResult>>
    where
        'env: 'scope,
    {
        let mut builder = Builder::new().name(self.thread_name(id));
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }

        let parent = span.span().clone();
        builder.spawn_scoped(scope, move || {
            let _entered = parent.enter();
            entry()
        })
    }

    fn thread_name(&self, id: &TaskId) -> String {
        let name = match &id.label {
            Some(label) => format!("{}-{}", self.config.thread_name_prefix, label),
            None => format!("{}-{}", self.config.thread_name_prefix, id.index),
        };
        // Thread names must not contain NUL
        name.replace('\0', "")
    }
}

/// Dispatch with the default configuration
pub fn dispatch(tasks: Vec<Task<'_>>) -> DispatchResult<()> {
    WorkerDispatcher::with_defaults().dispatch(tasks)
}

fn join_worker(id: TaskId, handle: ScopedJoinHandle<'_, TaskResult>) -> Option<WorkerFailure> {
    let cause = match handle.join() {
        Ok(Ok(())) => {
            debug!(task = %id, "worker finished");
            return None;
        }
        Ok(Err(err)) => FailureCause::Error(format!("{:#}", err)),
        Err(payload) => FailureCause::Panicked(panic_message(payload.as_ref())),
    };

    warn!(task = %id, cause = %cause, "worker failed");
    Some(WorkerFailure { task: id, cause })
}

fn refuse_all<'a, I>(tasks: I, reason: &StartRefusal) -> Vec<NotStarted>
where
    I: Iterator<Item = (usize, Task<'a>)>,
{
    tasks
        .map(|(index, task)| NotStarted {
            task: TaskId {
                index,
                label: task.label().map(str::to_owned),
            },
            reason: reason.clone(),
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

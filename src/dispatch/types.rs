/*!
 * Dispatch Types
 * Task identities and failure reports for fan-out/join batches
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Value returned by a task entry point
pub type TaskResult = anyhow::Result<()>;

/// Dispatch operation result
pub type DispatchResult<T> = Result<T, DispatchFailure>;

/// Identity of a task within one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskId {
    /// Position in the batch passed to `dispatch`
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "#{} ({})", self.index, label),
            None => write!(f, "#{}", self.index),
        }
    }
}

/// Why a started worker failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureCause {
    /// Entry point returned an error (rendered with its context chain)
    Error(String),
    /// Entry point panicked
    Panicked(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Error(msg) => write!(f, "error: {}", msg),
            FailureCause::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

/// Why a task never started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartRefusal {
    /// The OS refused to create a thread
    Spawn { detail: String },
    /// The batch exceeded `DispatchConfig::max_workers`
    WorkerLimit { limit: usize, requested: usize },
}

impl fmt::Display for StartRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartRefusal::Spawn { detail } => write!(f, "spawn failed: {}", detail),
            StartRefusal::WorkerLimit { limit, requested } => {
                write!(f, "worker limit {} exceeded by batch of {}", limit, requested)
            }
        }
    }
}

/// A worker that ran and did not finish cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub task: TaskId,
    pub cause: FailureCause,
}

/// A task that was never handed to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotStarted {
    pub task: TaskId,
    pub reason: StartRefusal,
}

/// One or more tasks in a batch failed or could not be started
///
/// Every started worker has been joined by the time this is returned.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[error(
    "dispatch failed: {} worker(s) failed, {} task(s) never started{}",
    .failed.len(),
    .not_started.len(),
    render_details(.failed, .not_started)
)]
#[diagnostic(
    code(dispatch::failed),
    help("Each entry names the task index and label; re-run that task alone to reproduce.")
)]
pub struct DispatchFailure {
    pub failed: Vec<WorkerFailure>,
    pub not_started: Vec<NotStarted>,
}

impl DispatchFailure {
    /// True when no task failed and every task started
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty() && self.not_started.is_empty()
    }

    /// Number of tasks that failed or never started
    pub fn len(&self) -> usize {
        self.failed.len() + self.not_started.len()
    }

    /// Failure recorded for the task at `index`, if any
    pub fn failure_for(&self, index: usize) -> Option<&WorkerFailure> {
        self.failed.iter().find(|f| f.task.index == index)
    }

    /// True when at least one task was refused a thread
    pub fn has_unstarted(&self) -> bool {
        !self.not_started.is_empty()
    }
}

fn render_details(failed: &[WorkerFailure], not_started: &[NotStarted]) -> String {
    let mut out = String::new();
    for failure in failed {
        out.push_str(&format!("\n  task {} {}", failure.task, failure.cause));
    }
    for refused in not_started {
        out.push_str(&format!("\n  task {} not started: {}", refused.task, refused.reason));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DispatchFailure {
        DispatchFailure {
            failed: vec![WorkerFailure {
                task: TaskId {
                    index: 1,
                    label: Some("parser".into()),
                },
                cause: FailureCause::Error("bad input: line 3".into()),
            }],
            not_started: vec![NotStarted {
                task: TaskId {
                    index: 2,
                    label: None,
                },
                reason: StartRefusal::Spawn {
                    detail: "Resource temporarily unavailable".into(),
                },
            }],
        }
    }

    #[test]
    fn test_display_names_every_task() {
        let text = sample().to_string();
        assert_eq!(
            text,
            "dispatch failed: 1 worker(s) failed, 1 task(s) never started\n  \
             task #1 (parser) error: bad input: line 3\n  \
             task #2 not started: spawn failed: Resource temporarily unavailable"
        );
    }

    #[test]
    fn test_lookup_helpers() {
        let failure = sample();
        assert_eq!(failure.len(), 2);
        assert!(!failure.is_empty());
        assert!(failure.has_unstarted());
        assert!(failure.failure_for(1).is_some());
        assert!(failure.failure_for(0).is_none());
        assert!(DispatchFailure::default().is_empty());
    }

    #[test]
    fn test_serializes_for_reports() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["failed"][0]["task"]["label"], "parser");
        assert_eq!(value["failed"][0]["cause"]["kind"], "error");
        assert_eq!(value["not_started"][0]["reason"]["kind"], "spawn");

        let back: DispatchFailure = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }
}

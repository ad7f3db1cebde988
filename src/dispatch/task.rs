/*!
 * Tasks
 * An entry point bound to the payload it owns
 */

use super::types::TaskResult;
use std::fmt;

type Entry<'scope> = Box<dyn FnOnce() -> TaskResult + Send + 'scope>;

/// One unit of work for a dispatch batch
///
/// The payload is moved into the task when it is built and handed to the
/// entry point by value on the worker thread, so no other worker can observe
/// it. Tasks may borrow anything that outlives the `dispatch` call, which is
/// how shared primitives like [`AtomicAccumulator`](crate::AtomicAccumulator)
/// are passed in.
///
/// # Example
///
/// ```
/// use kernel_sync::{dispatch, AtomicAccumulator, Task};
///
/// let hits = AtomicAccumulator::new(0);
/// let tasks = (0..4)
///     .map(|id| {
///         Task::new(id, |_id: u32| {
///             hits.increment();
///             Ok(())
///         })
///     })
///     .collect();
///
/// dispatch(tasks).unwrap();
/// assert_eq!(hits.load(), 4);
/// ```
pub struct Task<'scope> {
    label: Option<String>,
    entry: Entry<'scope>,
}

impl<'scope> Task<'scope> {
    /// Bind `entry` to its private `payload`
    pub fn new<P, F>(payload: P, entry: F) -> Self
    where
        P: Send + 'scope,
        F: FnOnce(P) -> TaskResult + Send + 'scope,
    {
        Self::from_fn(move || entry(payload))
    }

    /// Task whose closure already captures everything it needs
    pub fn from_fn<F>(entry: F) -> Self
    where
        F: FnOnce() -> TaskResult + Send + 'scope,
    {
        Self {
            label: None,
            entry: Box::new(entry),
        }
    }

    /// Attach a label used in thread names and failure reports
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Entry<'scope>) {
        (self.label, self.entry)
    }
}

impl fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/*!
 * Handoff Channel
 *
 * Single-slot rendezvous between a producer and a consumer, guarded by a
 * parking_lot mutex and condition variable.
 */

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Result type for handoff operations
pub type HandoffResult<T> = Result<T, HandoffError>;

/// Handoff operation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffError {
    #[error("Handoff slot already holds an unconsumed value")]
    AlreadyFilled,

    #[error("Handoff value was already consumed")]
    AlreadyConsumed,

    #[error("Timed out waiting for a handoff value")]
    Timeout,

    #[error("Handoff slot is empty")]
    Empty,
}

/// Observable state of a handoff slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    /// Nothing sent yet
    Empty,
    /// A value is waiting for its consumer
    Filled,
    /// The value was taken; the slot is retired until `reset()`
    Consumed,
}

enum SlotState<T> {
    Empty,
    Filled(T),
    Consumed,
}

struct Slot<T> {
    state: SlotState<T>,
    waiters: usize,
}

/// Single-use rendezvous point for one value
///
/// `send` stores the value and wakes one waiter; `receive` blocks (without
/// holding the lock) until a value is present, then takes it. Exactly one
/// `receive` call gets the value. Any waiter that loses the race, and any later
/// `receive`, observes [`HandoffError::AlreadyConsumed`].
///
/// # Examples
///
/// ```
/// use kernel_sync::HandoffChannel;
/// use std::thread;
///
/// let channel = HandoffChannel::new();
/// thread::scope(|s| {
///     s.spawn(|| channel.send(42).unwrap());
///     assert_eq!(channel.receive(), Ok(42));
/// });
/// ```
pub struct HandoffChannel<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> HandoffChannel<T> {
    /// Create an empty channel
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: SlotState::Empty,
                waiters: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Store `value` and wake one waiter
    ///
    /// Fails with `AlreadyFilled` if an unconsumed value is present (the stored
    /// value is left intact) and with `AlreadyConsumed` once the slot is retired.
    pub fn send(&self, value: T) -> HandoffResult<()> {
        let mut slot = self.slot.lock();
        match slot.state {
            SlotState::Filled(_) => return Err(HandoffError::AlreadyFilled),
            SlotState::Consumed => return Err(HandoffError::AlreadyConsumed),
            SlotState::Empty => {}
        }

        slot.state = SlotState::Filled(value);
        debug!(waiters = slot.waiters, "handoff filled");
        self.ready.notify_one();
        Ok(())
    }

    /// Block until a value is available and take it
    pub fn receive(&self) -> HandoffResult<T> {
        let mut slot = self.slot.lock();
        slot.waiters += 1;

        // Condvar wakeups may be spurious; re-check the state every time
        let outcome = loop {
            if let Some(outcome) = Self::take(&mut slot) {
                break outcome;
            }
            self.ready.wait(&mut slot);
        };

        self.finish_wait(&mut slot, &outcome);
        outcome
    }

    /// Like [`receive`](Self::receive) but gives up after `timeout`
    ///
    /// Returns `HandoffError::Timeout` if the slot is still empty at the
    /// deadline.
    pub fn receive_timeout(&self, timeout: Duration) -> HandoffResult<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.receive();
        };

        let mut slot = self.slot.lock();
        slot.waiters += 1;

        let outcome = loop {
            if let Some(outcome) = Self::take(&mut slot) {
                break outcome;
            }
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                break Self::take(&mut slot).unwrap_or(Err(HandoffError::Timeout));
            }
        };

        self.finish_wait(&mut slot, &outcome);
        outcome
    }

    /// Take the value if one is present, never blocking
    pub fn try_receive(&self) -> HandoffResult<T> {
        let mut slot = self.slot.lock();
        let outcome = Self::take(&mut slot).unwrap_or(Err(HandoffError::Empty));
        if outcome.is_ok() && slot.waiters > 0 {
            self.ready.notify_all();
        }
        outcome
    }

    /// Return a consumed slot to `Empty` for another cycle
    ///
    /// Resetting a filled slot fails with `AlreadyFilled` instead of dropping
    /// the pending value. Resetting an empty slot does nothing.
    pub fn reset(&self) -> HandoffResult<()> {
        let mut slot = self.slot.lock();
        match slot.state {
            SlotState::Filled(_) => Err(HandoffError::AlreadyFilled),
            SlotState::Empty => Ok(()),
            SlotState::Consumed => {
                slot.state = SlotState::Empty;
                debug!("handoff reset");
                Ok(())
            }
        }
    }

    /// Snapshot of the slot state
    pub fn state(&self) -> HandoffState {
        match self.slot.lock().state {
            SlotState::Empty => HandoffState::Empty,
            SlotState::Filled(_) => HandoffState::Filled,
            SlotState::Consumed => HandoffState::Consumed,
        }
    }

    /// Number of threads currently blocked in `receive` (for diagnostics)
    pub fn waiter_count(&self) -> usize {
        self.slot.lock().waiters
    }

    /// `None` while empty, otherwise the outcome for the caller
    fn take(slot: &mut Slot<T>) -> Option<HandoffResult<T>> {
        if matches!(slot.state, SlotState::Empty) {
            return None;
        }
        match mem::replace(&mut slot.state, SlotState::Consumed) {
            SlotState::Filled(value) => Some(Ok(value)),
            _ => Some(Err(HandoffError::AlreadyConsumed)),
        }
    }

    fn finish_wait(&self, slot: &mut Slot<T>, outcome: &HandoffResult<T>) {
        slot.waiters -= 1;
        if outcome.is_ok() {
            debug!(remaining_waiters = slot.waiters, "handoff consumed");
            // Release everyone else still parked so they observe AlreadyConsumed
            if slot.waiters > 0 {
                self.ready.notify_all();
            }
        }
    }
}

impl<T> Default for HandoffChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandoffChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffChannel")
            .field("state", &self.state())
            .field("waiters", &self.waiter_count())
            .finish()
    }
}

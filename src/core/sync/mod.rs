/*!
 * Synchronization Primitives
 *
 * Building blocks for sharing state between dispatched workers:
 * - `HandoffChannel`: single-value rendezvous on a mutex + condvar
 * - `AtomicAccumulator`: lock-free counter with relaxed fetch-add
 *
 * # Use Cases
 *
 * - **Completion signals**: Block a consumer until a producer hands over a result
 * - **Counters**: Tally work from many writers, read once after the join
 */

mod accumulator;
mod handoff;

pub use accumulator::AtomicAccumulator;
pub use handoff::{HandoffChannel, HandoffError, HandoffResult, HandoffState};

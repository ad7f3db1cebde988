/*!
 * Atomic Accumulator
 * Lock-free shared counter for many concurrent writers
 */

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counter updated with relaxed fetch-add
///
/// The only invariant is that the final count equals the initial value plus the
/// number of successful increments. Intermediate reads carry no ordering
/// relative to other memory, so `load()` is only a final value once every
/// writer has been joined (for example by `WorkerDispatcher::dispatch`).
///
/// Overflow wraps, as `AtomicU64::fetch_add` does. Size the run accordingly.
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering
#[repr(C, align(64))]
pub struct AtomicAccumulator {
    count: AtomicU64,
}

impl AtomicAccumulator {
    /// Create a counter starting at `initial`
    #[inline]
    pub const fn new(initial: u64) -> Self {
        Self {
            count: AtomicU64::new(initial),
        }
    }

    /// Add one (lock-free)
    ///
    /// # Performance
    /// Hot path - called from every writer
    #[inline(always)]
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n` and return the previous value
    #[inline(always)]
    pub fn add(&self, n: u64) -> u64 {
        self.count.fetch_add(n, Ordering::Relaxed)
    }

    /// Current count
    ///
    /// # Note
    /// While writers are still running this is merely some count issued so far.
    #[inline]
    pub fn load(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for AtomicAccumulator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for AtomicAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicAccumulator")
            .field("count", &self.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_at_initial() {
        assert_eq!(AtomicAccumulator::new(7).load(), 7);
        assert_eq!(AtomicAccumulator::default().load(), 0);
    }

    #[test]
    fn test_add_returns_previous() {
        let acc = AtomicAccumulator::new(10);
        assert_eq!(acc.add(5), 10);
        acc.increment();
        assert_eq!(acc.load(), 16);
    }

    #[test]
    fn test_wraps_on_overflow() {
        let acc = AtomicAccumulator::new(u64::MAX);
        acc.increment();
        assert_eq!(acc.load(), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let acc = Arc::new(AtomicAccumulator::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = acc.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        acc.increment();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(acc.load(), 80_000);
    }

    #[test]
    fn test_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<AtomicAccumulator>(), 64);
    }
}

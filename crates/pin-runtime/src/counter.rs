//! Shared pulse counter.
//!
//! One integer behind one mutex. The edge counter thread increments it, the
//! sampler drains it. Both operations are a single short critical section,
//! so every increment is seen by exactly one drain.

use crossbeam_utils::CachePadded;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Pulse count accumulated since the last drain.
#[derive(Debug, Default)]
pub struct PulseCounter {
    count: CachePadded<Mutex<u64>>,
}

impl PulseCounter {
    /// Create a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter already wrapped for sharing between threads.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // A panic while holding the lock cannot leave the integer half-written.
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one pulse.
    pub fn increment(&self) {
        let mut count = self.lock();
        *count = count.saturating_add(1);
    }

    /// Read the count and reset it to zero in one step.
    pub fn drain(&self) -> u64 {
        std::mem::take(&mut *self.lock())
    }

    /// Current count without resetting it.
    #[must_use]
    pub fn peek(&self) -> u64 {
        *self.lock()
    }
}

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A coalescing wake primitive: a single `ready` flag paired with a mutex
/// and condition variable.
///
/// [`post`](Self::post) sets the flag and wakes one waiter; posting while
/// the flag is already set collapses into a single wake. [`wait`](Self::wait)
/// returns only after observing and clearing the flag.
///
/// This is deliberately not a counting semaphore. The ring buffer parks at
/// most one writer or one reader at a time, and a woken waiter always
/// re-checks the counter state, so coalesced wakes cannot lose progress.
#[derive(Debug)]
pub struct BinarySemaphore {
    ready: Mutex<bool>,
    condvar: Condvar,
}

impl BinarySemaphore {
    /// Creates a semaphore with the given initial flag value.
    pub fn new(ready: bool) -> Self {
        Self {
            ready: Mutex::new(ready),
            condvar: Condvar::new(),
        }
    }

    // The protected state is a single bool, so a panicked holder cannot
    // leave it inconsistent; poisoning is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the flag and wakes one waiter, if any.
    ///
    /// Idempotent when the flag is already set. Never blocks.
    pub fn post(&self) {
        {
            let mut ready = self.lock();
            *ready = true;
        }
        // The lock does not need to be held for the notification.
        self.condvar.notify_one();
    }

    /// Blocks until the flag is observed set, then clears it.
    pub fn wait(&self) {
        let mut ready = self.lock();
        while !*ready {
            ready = self
                .condvar
                .wait(ready)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *ready = false;
    }

    /// As [`wait`](Self::wait), bounded by `timeout` against a monotonic
    /// clock.
    ///
    /// Returns `true` when the flag was consumed, `false` on expiry.
    /// Spurious wakeups re-arm the wait with the remaining time, measured
    /// from the moment the call started.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        let mut ready = self.lock();
        while !*ready {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return false;
            }
            let (guard, _) = self
                .condvar
                .wait_timeout(ready, timeout - elapsed)
                .unwrap_or_else(PoisonError::into_inner);
            ready = guard;
        }
        *ready = false;
        true
    }

    /// Snapshot of the flag for diagnostics.
    pub fn get_value(&self) -> bool {
        *self.lock()
    }
}

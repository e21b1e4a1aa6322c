//! Blocking primitives used around the worker pool.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Counting semaphore capping how many workers compute at once.
#[derive(Debug)]
pub struct ConcurrencyGate {
    available: Mutex<usize>,
    released: Condvar,
    limit: usize,
}

impl ConcurrencyGate {
    /// # Panics
    ///
    /// Panics if `limit == 0`, which would block every worker forever.
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "concurrency gate needs at least one permit");
        Self {
            available: Mutex::new(limit),
            released: Condvar::new(),
            limit,
        }
    }

    /// Blocks until a permit is free. The permit is returned on drop.
    pub fn acquire(&self) -> GatePermit<'_> {
        let mut available = lock(&self.available);
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(|e| e.into_inner());
        }
        *available -= 1;
        GatePermit { gate: self }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        *lock(&self.available)
    }

    fn release(&self) {
        *lock(&self.available) += 1;
        self.released.notify_one();
    }
}

/// RAII permit from [`ConcurrencyGate::acquire`].
#[must_use = "the permit is released as soon as it is dropped"]
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Countdown latch the scheduler waits on with a timeout.
#[derive(Debug)]
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    done: Condvar,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            done: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut remaining = lock(&self.remaining);
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.done.notify_all();
        }
    }

    /// Waits until the count reaches zero. Returns `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let remaining = lock(&self.remaining);
        let (remaining, _) = self
            .done
            .wait_timeout_while(remaining, timeout, |r| *r > 0)
            .unwrap_or_else(|e| e.into_inner());
        *remaining == 0
    }
}

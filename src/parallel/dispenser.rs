//! Row dispensers hand out disjoint row indices to concurrent workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Index of an output row (or of a band of rows for banded kernels).
pub type RowIndex = usize;

/// Hands out every index in `[0, bound)` exactly once across all callers.
///
/// `claim_next_row` is safe under concurrent calls from any number of
/// threads. Once it returns `None` it keeps returning `None`.
pub trait RowDispenser: Sync {
    fn claim_next_row(&self) -> Option<RowIndex>;

    /// Exclusive upper bound of the handed-out indices.
    fn bound(&self) -> usize;

    /// Indices handed out so far, saturating at `bound`.
    fn claimed(&self) -> usize;
}

/// Lock-free dispenser over a shared fetch-and-increment cursor.
#[derive(Debug)]
pub struct AtomicRowDispenser {
    next_row: AtomicUsize,
    bound: usize,
}

impl AtomicRowDispenser {
    pub fn new(bound: usize) -> Self {
        Self {
            next_row: AtomicUsize::new(0),
            bound,
        }
    }
}

impl RowDispenser for AtomicRowDispenser {
    #[inline]
    fn claim_next_row(&self) -> Option<RowIndex> {
        // Relaxed is enough: the index is the only data handed over, and the
        // scope join publishes the rows written under it.
        let i = self.next_row.fetch_add(1, Ordering::Relaxed);
        (i < self.bound).then_some(i)
    }

    fn bound(&self) -> usize {
        self.bound
    }

    fn claimed(&self) -> usize {
        self.next_row.load(Ordering::Relaxed).min(self.bound)
    }
}

/// Dispenser over a mutex-protected counter.
#[derive(Debug)]
pub struct LockedRowDispenser {
    next_row: Mutex<usize>,
    bound: usize,
}

impl LockedRowDispenser {
    pub fn new(bound: usize) -> Self {
        Self {
            next_row: Mutex::new(0),
            bound,
        }
    }

    fn cursor(&self) -> std::sync::MutexGuard<'_, usize> {
        // The counter is a plain integer, so a poisoned lock still holds a
        // consistent value.
        self.next_row.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RowDispenser for LockedRowDispenser {
    fn claim_next_row(&self) -> Option<RowIndex> {
        let mut next = self.cursor();
        if *next < self.bound {
            let i = *next;
            *next += 1;
            Some(i)
        } else {
            None
        }
    }

    fn bound(&self) -> usize {
        self.bound
    }

    fn claimed(&self) -> usize {
        *self.cursor()
    }
}

//! Fixed-pool parallel row scheduler.
//!
//! A run spawns exactly `threads` workers into a dedicated rayon pool. Each
//! worker repeatedly claims the next row index from a shared
//! [`RowDispenser`] and computes that whole output row, until the dispenser
//! is exhausted. Nothing is pre-assigned, so uneven row costs balance
//! themselves.
//!
//! Output rows are owned by whichever worker claimed them, so writes never
//! overlap and need no locking; A and B are only read.
//!
//! A kernel may ask for several rows per claim. The scheduler shrinks that
//! request so every worker can get at least [`CLAIMS_PER_WORKER`] claims.

pub mod dispenser;
pub mod gate;

use std::any::Any;
use std::cmp::min;
use std::marker::PhantomData;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use clap::ValueEnum;
use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{
    configuration_error, dimension_mismatch, worker_failure, MatBenchError, Result,
};
use crate::kernels::RowKernel;
use crate::DEFAULT_TIMEOUT;

pub use dispenser::{AtomicRowDispenser, LockedRowDispenser, RowDispenser, RowIndex};
pub use gate::{CompletionLatch, ConcurrencyGate, GatePermit};

/// Minimum number of claims the scheduler tries to give each worker.
pub const CLAIMS_PER_WORKER: usize = 4;

/// Which [`RowDispenser`] a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DispenserKind {
    /// Shared atomic fetch-and-increment cursor.
    #[default]
    Atomic,
    /// Mutex-protected counter.
    Locked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Pool size; one worker per thread.
    pub threads: usize,
    /// Optional cap on simultaneously computing workers. Ignored when it is
    /// not below `threads`.
    pub max_active: Option<usize>,
    /// How long the caller waits before declaring the run hung.
    pub timeout: Duration,
    pub dispenser: DispenserKind,
}

impl SchedulerConfig {
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            max_active: None,
            timeout: DEFAULT_TIMEOUT,
            dispenser: DispenserKind::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(configuration_error("thread count must be at least 1"));
        }
        if self.max_active == Some(0) {
            return Err(configuration_error("max active workers must be at least 1"));
        }
        Ok(())
    }
}

/// Per-run bookkeeping returned by [`ParallelScheduler::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Claims served to each worker, indexed by worker.
    pub claims_per_worker: Vec<usize>,
    /// Rows handed out per claim, after capping the kernel's request.
    pub rows_per_claim: usize,
    pub rows_total: usize,
}

impl ScheduleStats {
    pub fn total_claims(&self) -> usize {
        self.claims_per_worker.iter().sum()
    }
}

/// A fixed pool of worker threads reused across runs.
pub struct ParallelScheduler {
    pool: ThreadPool,
    config: SchedulerConfig,
}

impl std::fmt::Debug for ParallelScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelScheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ParallelScheduler {
    /// Builds a pool of exactly `config.threads` threads.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("matbench-worker-{}", i))
            .build()
            .map_err(|e| {
                configuration_error(format!(
                    "cannot build a {}-thread pool: {}",
                    config.threads, e
                ))
            })?;
        Ok(Self { pool, config })
    }

    pub fn with_threads(threads: usize) -> Result<Self> {
        Self::new(SchedulerConfig::new(threads))
    }

    pub fn threads(&self) -> usize {
        self.config.threads
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Computes every row of `out` with `kernel` across the pool.
    ///
    /// Blocks the calling thread until all workers finish or the timeout
    /// elapses.
    ///
    /// The timeout is checked between claims, not inside one. When it
    /// elapses the workers stop claiming, but each one still finishes the
    /// claim in hand, and the call only returns once they have. The wait is
    /// therefore bounded by the timeout plus the slowest claim in progress.
    /// If those last claims complete the product, the run succeeds after
    /// all; otherwise it fails with `Timeout` and the number of rows done.
    ///
    /// A panicking worker fails the run with `WorkerFailure`. On any error
    /// `out` is left partially written and must be discarded.
    pub fn run<K: RowKernel + ?Sized>(&self, kernel: &K, out: &mut [f64]) -> Result<ScheduleStats> {
        let n = kernel.dim();
        if out.len() != n * n {
            return Err(dimension_mismatch(format!(
                "output buffer has {} elements, kernel produces {}x{}",
                out.len(),
                n,
                n
            )));
        }
        let rows_per_claim = claim_size(kernel.rows_per_claim(), n, self.config.threads);
        let units = n.div_ceil(rows_per_claim);
        match self.config.dispenser {
            DispenserKind::Atomic => {
                self.run_with(kernel, &AtomicRowDispenser::new(units), rows_per_claim, out)
            }
            DispenserKind::Locked => {
                self.run_with(kernel, &LockedRowDispenser::new(units), rows_per_claim, out)
            }
        }
    }

    fn run_with<K, D>(
        &self,
        kernel: &K,
        dispenser: &D,
        rows_per_claim: usize,
        out: &mut [f64],
    ) -> Result<ScheduleStats>
    where
        K: RowKernel + ?Sized,
        D: RowDispenser,
    {
        let n = kernel.dim();
        let threads = self.config.threads;
        let timeout = self.config.timeout;

        let rows = DisjointRows::new(out, n);
        let gate = self
            .config
            .max_active
            .filter(|&limit| limit < threads)
            .map(ConcurrencyGate::new);
        let latch = CompletionLatch::new(threads);
        let abandon = AtomicBool::new(false);
        let failure: Mutex<Option<MatBenchError>> = Mutex::new(None);
        let claims: Vec<AtomicUsize> = (0..threads).map(|_| AtomicUsize::new(0)).collect();

        let completed = self.pool.in_place_scope(|s| {
            for worker in 0..threads {
                let (rows, gate, latch, abandon, failure, claims) =
                    (&rows, &gate, &latch, &abandon, &failure, &claims);
                s.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        let _permit = gate.as_ref().map(ConcurrencyGate::acquire);
                        while !abandon.load(Ordering::Relaxed) {
                            let Some(unit) = dispenser.claim_next_row() else {
                                break;
                            };
                            let first = unit * rows_per_claim;
                            let last = min(first + rows_per_claim, n);
                            // SAFETY: the dispenser hands `unit` out once, so no
                            // other worker holds rows first..last.
                            let block = unsafe { rows.rows_mut(first..last) };
                            kernel.compute_rows(first, block);
                            claims[worker].fetch_add(1, Ordering::Relaxed);
                        }
                    }));
                    if let Err(payload) = outcome {
                        abandon.store(true, Ordering::Relaxed);
                        failure
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .get_or_insert_with(|| worker_failure(worker, panic_message(&*payload)));
                    }
                    latch.count_down();
                });
            }

            let done = latch.wait_timeout(timeout);
            if !done {
                abandon.store(true, Ordering::Relaxed);
            }
            done
        });

        let claims_per_worker: Vec<usize> = claims.into_iter().map(AtomicUsize::into_inner).collect();
        let rows_done = min(claims_per_worker.iter().sum::<usize>() * rows_per_claim, n);

        if let Some(err) = failure.into_inner().unwrap_or_else(|e| e.into_inner()) {
            return Err(err);
        }
        if !completed {
            if rows_done < n {
                return Err(MatBenchError::Timeout {
                    timeout,
                    rows_completed: rows_done,
                    rows_total: n,
                });
            }
            debug!(
                "wait exceeded {:?} but the claims in hand finished all {} rows",
                timeout, n
            );
        }

        debug!(
            "{} workers finished {} rows ({} per claim), claims per worker {:?}",
            threads, n, rows_per_claim, claims_per_worker
        );

        Ok(ScheduleStats {
            claims_per_worker,
            rows_per_claim,
            rows_total: n,
        })
    }
}

/// Rows per claim: the kernel's request, cut down so that `threads` workers
/// see at least [`CLAIMS_PER_WORKER`] claims each where `n` allows it.
fn claim_size(requested: usize, n: usize, threads: usize) -> usize {
    let fair_share = n / threads.saturating_mul(CLAIMS_PER_WORKER).max(1);
    requested.clamp(1, fair_share.max(1))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Row-major output buffer shared by workers that write disjoint rows.
struct DisjointRows<'a> {
    ptr: *mut f64,
    len: usize,
    stride: usize,
    _marker: PhantomData<&'a mut [f64]>,
}

// SAFETY: access goes through `rows_mut`, whose contract forbids overlapping
// slices, so sharing the pointer is equivalent to splitting the slice.
unsafe impl Send for DisjointRows<'_> {}
unsafe impl Sync for DisjointRows<'_> {}

impl<'a> DisjointRows<'a> {
    fn new(buf: &'a mut [f64], stride: usize) -> Self {
        Self {
            ptr: buf.as_mut_ptr(),
            len: buf.len(),
            stride,
            _marker: PhantomData,
        }
    }

    /// Rows `rows.start..rows.end` as one mutable slice.
    ///
    /// # Safety
    ///
    /// No other slice obtained from this value and still alive may overlap
    /// `rows`.
    #[allow(clippy::mut_from_ref)]
    unsafe fn rows_mut(&self, rows: Range<usize>) -> &'a mut [f64] {
        let start = rows.start * self.stride;
        let end = rows.end * self.stride;
        assert!(
            start <= end && end <= self.len,
            "rows {:?} out of bounds for {} elements",
            rows,
            self.len
        );
        std::slice::from_raw_parts_mut(self.ptr.add(start), end - start)
    }
}

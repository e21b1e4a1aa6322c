//! Benchmark driver: repeats, timing, memory sampling and speedup.
//!
//! For every configured size the driver runs `repeats` independent
//! multiplications. Each repeat allocates and fills fresh operands, times a
//! single [`multiply`] call, samples memory, and drops everything, so no
//! warm cache carries over between repeats.
//!
//! Speedup is measured against a single-thread mean kept in a
//! [`BaselineCache`]. A driver with `threads == 1` fills the cache; drivers
//! for larger thread counts read it. The cache is an ordinary value handed
//! from one driver to the next.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use statrs::statistics::Statistics;

use crate::config::BenchConfig;
use crate::error::{MatBenchError, Result};
use crate::kernels::{multiply, Kernel, KernelParams, Operands};
use crate::parallel::ParallelScheduler;
use crate::utils::{bytes_to_mb, peak_resident_memory_mb, resident_memory_mb};

/// Single-thread mean time per matrix size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineCache {
    baselines: HashMap<usize, Duration>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) the baseline for size `n`.
    pub fn record(&mut self, n: usize, elapsed: Duration) {
        self.baselines.insert(n, elapsed);
    }

    pub fn get(&self, n: usize) -> Option<Duration> {
        self.baselines.get(&n).copied()
    }

    /// `baseline / elapsed`, or `1.0` when no baseline exists for `n` or
    /// `elapsed` is zero.
    pub fn speedup(&self, n: usize, elapsed: Duration) -> f64 {
        match self.get(n) {
            Some(base) if !elapsed.is_zero() => base.as_secs_f64() / elapsed.as_secs_f64(),
            _ => 1.0,
        }
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

/// Aggregated measurements for one `(kernel, n, threads)` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub kernel: Kernel,
    pub n: usize,
    pub threads: usize,
    pub repeats: usize,
    /// Elapsed time of each repeat, in run order.
    pub samples: Vec<Duration>,
    pub mean: Duration,
    /// Sample standard deviation in milliseconds; `0.0` for a single repeat.
    pub std_dev_ms: f64,
    pub speedup: f64,
    pub efficiency: f64,
    /// Process resident set after the last repeat, where the OS exposes it.
    pub resident_mb: Option<f64>,
    /// Process resident high-water mark after the last repeat. It is
    /// process-wide and monotonic, so it also covers earlier sizes.
    pub peak_resident_mb: Option<f64>,
    /// Analytic size of operands, product and scratch.
    pub working_set_mb: f64,
    pub block_size: usize,
    pub density: f64,
}

impl BenchmarkResult {
    pub fn mean_ms(&self) -> f64 {
        self.mean.as_secs_f64() * 1e3
    }

    /// Resident memory when available, otherwise the working-set estimate.
    pub fn memory_mb(&self) -> f64 {
        self.resident_mb.unwrap_or(self.working_set_mb)
    }
}

/// A size that was dropped because its matrices could not be allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSize {
    pub n: usize,
    pub reason: MatBenchError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkReport {
    pub results: Vec<BenchmarkResult>,
    pub skipped: Vec<SkippedSize>,
}

/// Runs one validated [`BenchConfig`].
#[derive(Debug)]
pub struct Driver {
    config: BenchConfig,
    params: KernelParams,
    scheduler: Option<ParallelScheduler>,
    baselines: BaselineCache,
}

impl Driver {
    /// Validates `config` and, for more than one thread, builds the worker
    /// pool that every repeat reuses.
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = if config.threads > 1 {
            Some(ParallelScheduler::new(config.scheduler_config())?)
        } else {
            None
        };
        Ok(Self {
            params: config.kernel_params(),
            config,
            scheduler,
            baselines: BaselineCache::new(),
        })
    }

    /// Seeds the driver with baselines recorded by an earlier run.
    pub fn with_baselines(mut self, baselines: BaselineCache) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn baselines(&self) -> &BaselineCache {
        &self.baselines
    }

    pub fn into_baselines(self) -> BaselineCache {
        self.baselines
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Benchmarks every configured size in order.
    ///
    /// A size whose matrices cannot be allocated is logged, listed in
    /// [`BenchmarkReport::skipped`] and passed over. Any other error ends
    /// the run.
    pub fn run(&mut self) -> Result<BenchmarkReport> {
        let mut report = BenchmarkReport::default();
        let sizes = self.config.sizes.clone();

        for n in sizes {
            match self.run_size(n) {
                Ok(result) => report.results.push(result),
                Err(err) if err.is_recoverable() => {
                    warn!("skipping n={}: {}", n, err);
                    report.skipped.push(SkippedSize { n, reason: err });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    /// Benchmarks a single size.
    pub fn run_size(&mut self, n: usize) -> Result<BenchmarkResult> {
        let kernel = self.config.kernel;
        let threads = self.config.threads;
        let repeats = self.config.repeats;
        info!(
            "{} n={} threads={} repeats={}",
            kernel, n, threads, repeats
        );

        let mut samples = Vec::with_capacity(repeats);
        let mut resident_mb = None;
        let mut peak_resident_mb = None;
        let mut working_set_bytes = 0;

        for r in 0..repeats {
            let operands = Operands::generate(kernel, n, &self.params, self.config.seed)?;
            working_set_bytes = operands.working_set_bytes(kernel);

            let start = Instant::now();
            let product = multiply(kernel, &operands, &self.params, self.scheduler.as_ref())?;
            let elapsed = start.elapsed();

            resident_mb = resident_memory_mb();
            peak_resident_mb = peak_resident_memory_mb();
            drop(product);

            debug!(
                "{} n={} repeat {}/{}: {:.3} ms",
                kernel,
                n,
                r + 1,
                repeats,
                elapsed.as_secs_f64() * 1e3
            );
            samples.push(elapsed);
        }

        let samples_ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1e3).collect();
        let mean_ms = samples_ms.iter().mean();
        let std_dev_ms = if samples_ms.len() > 1 {
            samples_ms.iter().std_dev()
        } else {
            0.0
        };
        let mean = Duration::from_secs_f64(mean_ms / 1e3);

        if threads == 1 {
            self.baselines.record(n, mean);
        }
        let speedup = self.baselines.speedup(n, mean);
        let efficiency = speedup / threads as f64;

        info!(
            "{} n={} threads={}: mean {:.3} ms (sd {:.3}), speedup {:.3}, efficiency {:.3}",
            kernel, n, threads, mean_ms, std_dev_ms, speedup, efficiency
        );

        Ok(BenchmarkResult {
            kernel,
            n,
            threads,
            repeats,
            samples,
            mean,
            std_dev_ms,
            speedup,
            efficiency,
            resident_mb,
            peak_resident_mb,
            working_set_mb: bytes_to_mb(working_set_bytes),
            block_size: self.params.block_size,
            density: self.params.density,
        })
    }
}

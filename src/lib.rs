//! # matbench
//!
//! A microbenchmark harness for square matrix multiplication.
//!
//! Four kernels share one row-oriented interface:
//!
//! - `basic`: `i, k, j` triple loop streaming rows of B
//! - `blocked`: the same loop order replayed inside cache-sized tiles
//! - `transposed`: dot products against a materialised `Bᵗ`
//! - `sparse`: CSR `A` times dense `B`
//!
//! Any kernel runs either on the calling thread or across a fixed pool of
//! workers that claim output rows dynamically from a shared counter. The
//! [`driver`] repeats each configuration, measures wall-clock time and memory,
//! and derives speedup and efficiency against a single-thread baseline.
//!
//! ```
//! use matbench::kernels::{multiply, Kernel, KernelParams, Operands};
//! use matbench::parallel::ParallelScheduler;
//!
//! let params = KernelParams::default();
//! let ops = Operands::generate(Kernel::Blocked, 32, &params, matbench::BASE_SEED)?;
//! let serial = multiply(Kernel::Blocked, &ops, &params, None)?;
//!
//! let pool = ParallelScheduler::with_threads(4)?;
//! let parallel = multiply(Kernel::Blocked, &ops, &params, Some(&pool))?;
//! assert_eq!(serial, parallel);
//! # Ok::<(), matbench::MatBenchError>(())
//! ```

use std::time::Duration;

pub mod config;
pub mod driver;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod parallel;
pub mod report;
pub mod utils;

pub use config::BenchConfig;
pub use driver::{BaselineCache, BenchmarkReport, BenchmarkResult, Driver};
pub use error::{MatBenchError, Result};
pub use kernels::{multiply, Kernel, KernelParams, Operands};
pub use matrix::{DenseMatrix, SparseMatrix};
pub use parallel::{ParallelScheduler, SchedulerConfig};

/// Seed for A; B is generated from `BASE_SEED + 1`.
pub const BASE_SEED: u64 = 403086;

/// Tile side of the blocked kernel.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Fraction of non-zeros in the generated sparse operand.
pub const DEFAULT_DENSITY: f64 = 0.05;

pub const DEFAULT_REPEATS: usize = 3;

/// How long a parallel run may take before it is treated as hung.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

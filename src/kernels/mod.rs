//! Matrix-multiplication kernels.
//!
//! Every kernel computes `C = A × B` for square `n × n` operands into a
//! zeroed, row-major `C`. They differ only in memory access pattern:
//!
//! - `naive`: `i, k, j` order, streaming rows of B and C
//! - `blocked`: the same order replayed inside cubic tiles
//! - `transposed`: dot products against a materialised `Bᵗ`
//! - `sparse`: CSR `A` times dense `B`, cost proportional to `nnz(A) × n`
//!
//! Each kernel implements [`RowKernel`], which lets the serial path and the
//! [`ParallelScheduler`] share the same inner loops.

pub mod blocked;
pub mod naive;
pub mod sparse;
pub mod transposed;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::{configuration_error, dimension_mismatch, Result};
use crate::matrix::{generate::validate_density, generate_sparse, DenseMatrix, SparseMatrix};
use crate::parallel::ParallelScheduler;
use crate::DEFAULT_BLOCK_SIZE;

pub use blocked::{matmul_blocked, BlockedKernel};
pub use naive::{matmul_naive, naive_row, NaiveKernel};
pub use sparse::{matmul_sparse, SparseKernel};
pub use transposed::{matmul_transposed, transpose, TransposedKernel};

/// Computes whole output rows of `C = A × B`.
///
/// `compute_rows(first_row, out)` fills rows `first_row..first_row + out.len() / n`
/// of C, where `out` is exactly those rows of the zeroed output buffer. It
/// reads A and B only, so one kernel value can be shared by every worker.
pub trait RowKernel: Sync {
    /// Side length `n` of the operands.
    fn dim(&self) -> usize;

    /// Preferred number of consecutive rows per claim. The scheduler may
    /// pass fewer, so `compute_rows` must accept any row count.
    fn rows_per_claim(&self) -> usize {
        1
    }

    fn compute_rows(&self, first_row: usize, out: &mut [f64]);
}

/// Kernel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Kernel {
    /// Triple loop in `i, k, j` order.
    Basic,
    /// Cache-blocked `i, k, j` over `block_size` tiles.
    Blocked,
    /// Dot products against a transposed copy of B.
    Transposed,
    /// CSR left operand times dense B.
    Sparse,
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [
        Kernel::Basic,
        Kernel::Blocked,
        Kernel::Transposed,
        Kernel::Sparse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Basic => "basic",
            Kernel::Blocked => "blocked",
            Kernel::Transposed => "transposed",
            Kernel::Sparse => "sparse",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = crate::error::MatBenchError;

    fn from_str(s: &str) -> Result<Self> {
        Kernel::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                configuration_error(format!(
                    "unknown kernel '{}', expected basic|blocked|transposed|sparse",
                    s
                ))
            })
    }
}

/// Kernel-specific knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    /// Tile side for the blocked kernel.
    pub block_size: usize,
    /// Fraction of non-zero entries in the sparse left operand.
    pub density: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            density: crate::DEFAULT_DENSITY,
        }
    }
}

impl KernelParams {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(configuration_error("block size must be positive"));
        }
        validate_density(self.density)
    }
}

/// Left-hand operand: dense for the dense kernels, CSR for `sparse`.
#[derive(Debug, Clone, PartialEq)]
pub enum LeftOperand {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl LeftOperand {
    pub fn dim(&self) -> usize {
        match self {
            LeftOperand::Dense(m) => m.dim(),
            LeftOperand::Sparse(s) => s.dim(),
        }
    }

    pub fn memory_bytes(&self) -> usize {
        match self {
            LeftOperand::Dense(m) => m.memory_bytes(),
            LeftOperand::Sparse(s) => s.memory_bytes(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LeftOperand::Dense(_) => "dense",
            LeftOperand::Sparse(_) => "sparse",
        }
    }
}

/// The pair `(A, B)` for one multiplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Operands {
    pub a: LeftOperand,
    pub b: DenseMatrix,
}

impl Operands {
    /// Pairs two operands after checking they have the same side length.
    pub fn new(a: LeftOperand, b: DenseMatrix) -> Result<Self> {
        if a.dim() != b.dim() {
            return Err(dimension_mismatch(format!(
                "A is {}x{} but B is {}x{}",
                a.dim(),
                a.dim(),
                b.dim(),
                b.dim()
            )));
        }
        Ok(Self { a, b })
    }

    pub fn dense(a: DenseMatrix, b: DenseMatrix) -> Result<Self> {
        Self::new(LeftOperand::Dense(a), b)
    }

    /// Generates the operands `kernel` expects.
    ///
    /// A is drawn from `seed` (CSR at `params.density` for the sparse
    /// kernel), B from `seed + 1`. The density is validated before anything
    /// is allocated.
    pub fn generate(kernel: Kernel, n: usize, params: &KernelParams, seed: u64) -> Result<Self> {
        params.validate()?;
        let a = match kernel {
            Kernel::Sparse => LeftOperand::Sparse(generate_sparse(n, params.density, seed)?),
            _ => LeftOperand::Dense(DenseMatrix::random(n, seed)?),
        };
        let b = DenseMatrix::random(n, seed.wrapping_add(1))?;
        Ok(Self { a, b })
    }

    pub fn dim(&self) -> usize {
        self.b.dim()
    }

    /// Bytes touched by `kernel`: both operands, C, and `Bᵗ` when transposing.
    pub fn working_set_bytes(&self, kernel: Kernel) -> usize {
        let dense = self.b.memory_bytes();
        let scratch = if kernel == Kernel::Transposed { dense } else { 0 };
        self.a.memory_bytes() + dense + dense + scratch
    }
}

/// Runs `kernel` over `operands` and returns the product.
///
/// With `scheduler == None` the rows are computed on the calling thread;
/// otherwise they are spread over the scheduler's pool. The output is
/// discarded if the parallel run fails, so a partially written C is never
/// returned.
///
/// # Errors
///
/// - `ConfigurationError` for invalid params or when the operand kind does
///   not match the kernel (e.g. `sparse` with a dense A)
/// - `AllocationError` when C or `Bᵗ` cannot be allocated
/// - `Timeout` / `WorkerFailure` from the scheduler
pub fn multiply(
    kernel: Kernel,
    operands: &Operands,
    params: &KernelParams,
    scheduler: Option<&ParallelScheduler>,
) -> Result<DenseMatrix> {
    params.validate()?;
    let mut c = DenseMatrix::zeros(operands.dim())?;
    let b = &operands.b;

    match (kernel, &operands.a) {
        (Kernel::Basic, LeftOperand::Dense(a)) => {
            execute(&NaiveKernel::new(a, b)?, &mut c, scheduler)?
        }
        (Kernel::Blocked, LeftOperand::Dense(a)) => {
            execute(&BlockedKernel::new(a, b, params.block_size)?, &mut c, scheduler)?
        }
        (Kernel::Transposed, LeftOperand::Dense(a)) => {
            execute(&TransposedKernel::new(a, b)?, &mut c, scheduler)?
        }
        (Kernel::Sparse, LeftOperand::Sparse(a)) => {
            execute(&SparseKernel::new(a, b)?, &mut c, scheduler)?
        }
        (kernel, a) => {
            return Err(configuration_error(format!(
                "{} kernel cannot take a {} left operand",
                kernel,
                a.kind()
            )))
        }
    }

    Ok(c)
}

fn execute<K: RowKernel>(
    kernel: &K,
    c: &mut DenseMatrix,
    scheduler: Option<&ParallelScheduler>,
) -> Result<()> {
    match scheduler {
        Some(scheduler) => {
            scheduler.run(kernel, c.as_mut_slice())?;
        }
        None => kernel.compute_rows(0, c.as_mut_slice()),
    }
    Ok(())
}

pub(crate) fn check_square(name: &str, len: usize, n: usize) -> Result<()> {
    if len != n * n {
        return Err(dimension_mismatch(format!(
            "{}: expected {}x{}={} elements, got {}",
            name,
            n,
            n,
            n * n,
            len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatBenchError;

    fn scenario() -> Operands {
        let a = DenseMatrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let b = DenseMatrix::from_rows(&[&[5.0, 6.0], &[7.0, 8.0]]).unwrap();
        Operands::dense(a, b).unwrap()
    }

    #[test]
    fn test_kernel_names_round_trip() {
        for kernel in Kernel::ALL {
            assert_eq!(kernel.name().parse::<Kernel>().unwrap(), kernel);
            assert_eq!(kernel.to_string(), kernel.name());
        }
        assert_eq!("BLOCKED".parse::<Kernel>().unwrap(), Kernel::Blocked);
        assert!("strassen".parse::<Kernel>().is_err());
    }

    #[test]
    fn test_dense_kernels_on_2x2() {
        let ops = scenario();
        let params = KernelParams::default();
        for kernel in [Kernel::Basic, Kernel::Blocked, Kernel::Transposed] {
            let c = multiply(kernel, &ops, &params, None).unwrap();
            assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0], "{}", kernel);
        }
    }

    #[test]
    fn test_sparse_kernel_on_2x2() {
        let a = SparseMatrix::from_parts(2, vec![0, 2, 4], vec![1, 0, 0, 1], vec![2.0, 1.0, 3.0, 4.0])
            .unwrap();
        let b = DenseMatrix::from_rows(&[&[5.0, 6.0], &[7.0, 8.0]]).unwrap();
        let ops = Operands::new(LeftOperand::Sparse(a), b).unwrap();
        let c = multiply(Kernel::Sparse, &ops, &KernelParams::default(), None).unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_operand_mismatch_is_configuration_error() {
        let ops = scenario();
        let err = multiply(Kernel::Sparse, &ops, &KernelParams::default(), None).unwrap_err();
        assert!(matches!(err, MatBenchError::ConfigurationError { .. }));
    }

    #[test]
    fn test_invalid_params() {
        let ops = scenario();
        let zero_block = KernelParams {
            block_size: 0,
            ..KernelParams::default()
        };
        assert!(multiply(Kernel::Blocked, &ops, &zero_block, None).is_err());

        let bad_density = KernelParams {
            density: 2.0,
            ..KernelParams::default()
        };
        assert!(matches!(
            Operands::generate(Kernel::Sparse, 8, &bad_density, 1),
            Err(MatBenchError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_generate_shapes() {
        let params = KernelParams::default();
        let dense = Operands::generate(Kernel::Basic, 5, &params, 3).unwrap();
        assert!(matches!(dense.a, LeftOperand::Dense(_)));
        assert_eq!(dense.dim(), 5);

        let sparse = Operands::generate(Kernel::Sparse, 5, &params, 3).unwrap();
        assert!(matches!(sparse.a, LeftOperand::Sparse(_)));
        assert_eq!(sparse.b, dense.b);
    }

    #[test]
    fn test_operands_dimension_mismatch() {
        let a = DenseMatrix::zeros(2).unwrap();
        let b = DenseMatrix::zeros(3).unwrap();
        assert!(matches!(
            Operands::dense(a, b),
            Err(MatBenchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_working_set_counts_transpose_scratch() {
        let ops = Operands::generate(Kernel::Basic, 4, &KernelParams::default(), 0).unwrap();
        let dense = 4 * 4 * 8;
        assert_eq!(ops.working_set_bytes(Kernel::Basic), 3 * dense);
        assert_eq!(ops.working_set_bytes(Kernel::Transposed), 4 * dense);
    }
}

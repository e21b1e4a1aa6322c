use super::{check_square, RowKernel};
use crate::error::{dimension_mismatch, Result};
use crate::matrix::{DenseMatrix, SparseMatrix};

/// CSR `A` times dense `B`.
///
/// Row `i` of C accumulates `v * B[k][..]` for each stored `(k, v)` of row
/// `i` of A, so the cost is `nnz(A) × n` instead of `n³`. Rows can have very
/// different entry counts, which is where dynamic row claiming pays off.
#[derive(Debug, Clone, Copy)]
pub struct SparseKernel<'a> {
    a: &'a SparseMatrix,
    b: &'a [f64],
    n: usize,
}

impl<'a> SparseKernel<'a> {
    pub fn new(a: &'a SparseMatrix, b: &'a DenseMatrix) -> Result<Self> {
        Self::from_slice(a, b.as_slice())
    }

    pub fn from_slice(a: &'a SparseMatrix, b: &'a [f64]) -> Result<Self> {
        let n = a.dim();
        check_square("B", b.len(), n)
            .map_err(|_| dimension_mismatch(format!("B does not match {}x{} CSR A", n, n)))?;
        Ok(Self { a, b, n })
    }
}

impl RowKernel for SparseKernel<'_> {
    fn dim(&self) -> usize {
        self.n
    }

    fn compute_rows(&self, first_row: usize, out: &mut [f64]) {
        let n = self.n;
        for (r, c_row) in out.chunks_exact_mut(n).enumerate() {
            let (cols, vals) = self.a.row(first_row + r);
            for (&k, &aik) in cols.iter().zip(vals) {
                let b_row = &self.b[k * n..(k + 1) * n];
                for (c, &bkj) in c_row.iter_mut().zip(b_row) {
                    *c += aik * bkj;
                }
            }
        }
    }
}

/// `C += A × B` for CSR `A`, single-threaded.
///
/// # Errors
///
/// `DimensionMismatch` if `b` or `c` is not `n × n` for the `n` of `a`.
pub fn matmul_sparse(a: &SparseMatrix, b: &[f64], c: &mut [f64]) -> Result<()> {
    check_square("C", c.len(), a.dim())?;
    SparseKernel::from_slice(a, b)?.compute_rows(0, c);
    Ok(())
}

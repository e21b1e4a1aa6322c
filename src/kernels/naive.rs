use super::{check_square, RowKernel};
use crate::error::Result;
use crate::matrix::DenseMatrix;

/// Cache-friendly multiplication in `i, k, j` loop order.
///
/// With `j` innermost, each step streams contiguously through row `k` of B
/// and row `i` of C. The order is what this kernel measures; do not swap
/// `j` and `k`.
#[derive(Debug, Clone, Copy)]
pub struct NaiveKernel<'a> {
    a: &'a [f64],
    b: &'a [f64],
    n: usize,
}

impl<'a> NaiveKernel<'a> {
    pub fn new(a: &'a DenseMatrix, b: &'a DenseMatrix) -> Result<Self> {
        Self::from_slices(a.as_slice(), b.as_slice(), a.dim())
    }

    pub fn from_slices(a: &'a [f64], b: &'a [f64], n: usize) -> Result<Self> {
        check_square("A", a.len(), n)?;
        check_square("B", b.len(), n)?;
        Ok(Self { a, b, n })
    }
}

impl RowKernel for NaiveKernel<'_> {
    fn dim(&self) -> usize {
        self.n
    }

    fn compute_rows(&self, first_row: usize, out: &mut [f64]) {
        let n = self.n;
        for (r, c_row) in out.chunks_exact_mut(n).enumerate() {
            let i = first_row + r;
            naive_row(&self.a[i * n..(i + 1) * n], self.b, c_row);
        }
    }
}

/// One output row: `c_row += a_row × B`.
///
/// `a_row` and `c_row` have length `n`; `b` is the full `n × n` matrix.
#[inline]
pub fn naive_row(a_row: &[f64], b: &[f64], c_row: &mut [f64]) {
    let n = c_row.len();
    for (&aik, b_row) in a_row.iter().zip(b.chunks_exact(n)) {
        for (c, &bkj) in c_row.iter_mut().zip(b_row) {
            *c += aik * bkj;
        }
    }
}

/// `C += A × B` for row-major `n × n` slices, single-threaded.
///
/// # Panics
///
/// Panics if any slice length is not `n * n`.
pub fn matmul_naive(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);
    match NaiveKernel::from_slices(a, b, n) {
        Ok(kernel) => kernel.compute_rows(0, c),
        Err(e) => panic!("{}", e),
    }
}

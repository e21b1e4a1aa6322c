use super::{check_square, RowKernel};
use crate::error::Result;
use crate::matrix::DenseMatrix;
use crate::utils::try_alloc_zeroed_f64;

/// Multiplication against a materialised `Bᵗ`.
///
/// `Bᵗ` is built once (an extra `n × n` buffer and an `O(n²)` pass), after
/// which `C[i][j]` is the dot product of row `i` of A and row `j` of `Bᵗ`.
/// Both operands are then read with unit stride.
#[derive(Debug, Clone)]
pub struct TransposedKernel<'a> {
    a: &'a [f64],
    bt: Vec<f64>,
    n: usize,
}

impl<'a> TransposedKernel<'a> {
    /// Allocates and fills `Bᵗ`.
    ///
    /// # Errors
    ///
    /// `AllocationError` if the transpose buffer cannot be obtained.
    pub fn new(a: &'a DenseMatrix, b: &DenseMatrix) -> Result<Self> {
        Self::from_slices(a.as_slice(), b.as_slice(), a.dim())
    }

    pub fn from_slices(a: &'a [f64], b: &[f64], n: usize) -> Result<Self> {
        check_square("A", a.len(), n)?;
        check_square("B", b.len(), n)?;
        let mut bt = try_alloc_zeroed_f64(n * n)?;
        transpose(b, &mut bt, n);
        Ok(Self { a, bt, n })
    }

    /// The transposed right operand.
    pub fn transposed_b(&self) -> &[f64] {
        &self.bt
    }
}

impl RowKernel for TransposedKernel<'_> {
    fn dim(&self) -> usize {
        self.n
    }

    fn compute_rows(&self, first_row: usize, out: &mut [f64]) {
        let n = self.n;
        for (r, c_row) in out.chunks_exact_mut(n).enumerate() {
            let i = first_row + r;
            let a_row = &self.a[i * n..(i + 1) * n];
            for (c, bt_row) in c_row.iter_mut().zip(self.bt.chunks_exact(n)) {
                *c = a_row.iter().zip(bt_row).map(|(x, y)| x * y).sum();
            }
        }
    }
}

/// `dst = srcᵗ` for row-major `n × n` buffers.
///
/// Column `j` of `src` becomes row `j` of `dst`.
///
/// # Example
///
/// ```
/// use matbench::kernels::transpose;
///
/// let src = vec![1.0, 2.0,
///                3.0, 4.0];
/// let mut dst = vec![0.0; 4];
/// transpose(&src, &mut dst, 2);
/// assert_eq!(dst, vec![1.0, 3.0,
///                      2.0, 4.0]);
/// ```
pub fn transpose(src: &[f64], dst: &mut [f64], n: usize) {
    for (i, src_row) in src.chunks_exact(n).enumerate() {
        for (j, &x) in src_row.iter().enumerate() {
            dst[j * n + i] = x;
        }
    }
}

/// `C = A × B` through a transposed copy of B, single-threaded.
///
/// Unlike the other kernels this overwrites C rather than accumulating.
///
/// # Errors
///
/// `DimensionMismatch` for wrong slice lengths, `AllocationError` if `Bᵗ`
/// cannot be allocated.
pub fn matmul_transposed(a: &[f64], b: &[f64], c: &mut [f64], n: usize) -> Result<()> {
    check_square("C", c.len(), n)?;
    TransposedKernel::from_slices(a, b, n)?.compute_rows(0, c);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::matmul_naive;

    #[test]
    fn test_transpose_3x3() {
        let src: Vec<f64> = (1..=9).map(|x| x as f64).collect();
        let mut dst = vec![0.0; 9];
        transpose(&src, &mut dst, 3);
        assert_eq!(dst, vec![1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_matches_naive() {
        for n in [1, 2, 5, 16, 33] {
            let a: Vec<f64> = (0..n * n).map(|x| (x % 10) as f64).collect();
            let b: Vec<f64> = (0..n * n).map(|x| (x % 7) as f64 - 3.0).collect();

            let mut expected = vec![0.0; n * n];
            matmul_naive(&a, &b, &mut expected, n);

            let mut c = vec![0.0; n * n];
            matmul_transposed(&a, &b, &mut c, n).unwrap();
            // integer-valued operands: every partial sum is exact
            assert_eq!(c, expected, "n={}", n);
        }
    }

    #[test]
    fn test_kernel_keeps_transposed_copy() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let kernel = TransposedKernel::from_slices(&a, &b, 2).unwrap();
        assert_eq!(kernel.transposed_b(), &[5.0, 7.0, 6.0, 8.0]);
    }

    #[test]
    fn test_wrong_output_length() {
        let mut c = [0.0; 3];
        assert!(matmul_transposed(&[1.0; 4], &[1.0; 4], &mut c, 2).is_err());
    }
}

use std::cmp::min;

use super::{check_square, RowKernel};
use crate::error::{configuration_error, Result};
use crate::matrix::DenseMatrix;

/// Cache-blocked multiplication.
///
/// The `i, k, j` iteration space is cut into cubic tiles of side
/// `block_size` and walked tile by tile in `ii, kk, jj` order. Inside a tile
/// the naive `i, k, j` order is replayed, clipped to `min(tile + block_size, n)`.
///
/// For every `C[i][j]` the `k` contributions still arrive in ascending order,
/// so the result matches [`NaiveKernel`](super::NaiveKernel) bit for bit.
///
/// In parallel runs a worker asks for a band of `block_size` rows per
/// claim. The scheduler may hand out shorter bands when `n` is small next to
/// the thread count; any band still walks `kk` in ascending order, so the
/// result does not depend on how rows were grouped.
#[derive(Debug, Clone, Copy)]
pub struct BlockedKernel<'a> {
    a: &'a [f64],
    b: &'a [f64],
    n: usize,
    block_size: usize,
}

impl<'a> BlockedKernel<'a> {
    pub fn new(a: &'a DenseMatrix, b: &'a DenseMatrix, block_size: usize) -> Result<Self> {
        Self::from_slices(a.as_slice(), b.as_slice(), a.dim(), block_size)
    }

    pub fn from_slices(a: &'a [f64], b: &'a [f64], n: usize, block_size: usize) -> Result<Self> {
        check_square("A", a.len(), n)?;
        check_square("B", b.len(), n)?;
        if block_size == 0 {
            return Err(configuration_error("block size must be positive"));
        }
        Ok(Self {
            a,
            b,
            n,
            block_size,
        })
    }

    /// One `ii` band: rows `first_row..first_row + band.len() / n`.
    fn band(&self, first_row: usize, band: &mut [f64]) {
        let (n, bs) = (self.n, self.block_size);
        let rows = band.len() / n;

        for kk in (0..n).step_by(bs) {
            let km = min(kk + bs, n);
            for jj in (0..n).step_by(bs) {
                let jm = min(jj + bs, n);
                for r in 0..rows {
                    let i = first_row + r;
                    let a_row = &self.a[i * n..(i + 1) * n];
                    let c_tile = &mut band[r * n + jj..r * n + jm];
                    for (k, &aik) in a_row.iter().enumerate().take(km).skip(kk) {
                        let b_tile = &self.b[k * n + jj..k * n + jm];
                        for (c, &bkj) in c_tile.iter_mut().zip(b_tile) {
                            *c += aik * bkj;
                        }
                    }
                }
            }
        }
    }
}

impl RowKernel for BlockedKernel<'_> {
    fn dim(&self) -> usize {
        self.n
    }

    fn rows_per_claim(&self) -> usize {
        self.block_size
    }

    fn compute_rows(&self, first_row: usize, out: &mut [f64]) {
        let band_len = self.block_size * self.n;
        for (b, band) in out.chunks_mut(band_len).enumerate() {
            self.band(first_row + b * self.block_size, band);
        }
    }
}

/// `C += A × B` with `block_size` tiles, single-threaded.
///
/// # Panics
///
/// Panics if any slice length is not `n * n` or `block_size == 0`.
pub fn matmul_blocked(a: &[f64], b: &[f64], c: &mut [f64], n: usize, block_size: usize) {
    assert_eq!(c.len(), n * n, "C: expected {}x{}={} elements", n, n, n * n);
    match BlockedKernel::from_slices(a, b, n, block_size) {
        Ok(kernel) => kernel.compute_rows(0, c),
        Err(e) => panic!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::matmul_naive;

    fn operands(n: usize) -> (Vec<f64>, Vec<f64>) {
        let a = (0..n * n).map(|x| ((x * 7) % 11) as f64 / 3.0).collect();
        let b = (0..n * n).map(|x| ((x * 5) % 13) as f64 / 7.0).collect();
        (a, b)
    }

    #[test]
    fn test_block_sizes_match_naive_exactly() {
        // Sizes straddle tile boundaries so clipping is exercised.
        for n in [1, 3, 4, 7, 8, 9, 17] {
            let (a, b) = operands(n);
            let mut expected = vec![0.0; n * n];
            matmul_naive(&a, &b, &mut expected, n);

            for bs in [1, 2, 3, 4, 8, 64] {
                let mut c = vec![0.0; n * n];
                matmul_blocked(&a, &b, &mut c, n, bs);
                assert_eq!(c, expected, "n={} block_size={}", n, bs);
            }
        }
    }

    #[test]
    fn test_band_claims_match_full_run() {
        let n = 10;
        let bs = 4;
        let (a, b) = operands(n);
        let kernel = BlockedKernel::from_slices(&a, &b, n, bs).unwrap();

        let mut full = vec![0.0; n * n];
        kernel.compute_rows(0, &mut full);

        // Bands of 4, 4, 2 rows computed independently.
        let mut banded = vec![0.0; n * n];
        for (claim, band) in banded.chunks_mut(bs * n).enumerate() {
            kernel.compute_rows(claim * bs, band);
        }
        assert_eq!(banded, full);
    }

    #[test]
    fn test_short_claims_match_full_run() {
        let n = 13;
        let bs = 8;
        let (a, b) = operands(n);
        let kernel = BlockedKernel::from_slices(&a, &b, n, bs).unwrap();

        let mut full = vec![0.0; n * n];
        kernel.compute_rows(0, &mut full);

        // Claims of 3 rows start mid-tile.
        let mut short = vec![0.0; n * n];
        for (claim, rows) in short.chunks_mut(3 * n).enumerate() {
            kernel.compute_rows(claim * 3, rows);
        }
        assert_eq!(short, full);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        assert!(BlockedKernel::from_slices(&[1.0], &[1.0], 1, 0).is_err());
    }
}

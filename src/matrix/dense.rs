use crate::error::{allocation_error, dimension_mismatch, Result};
use crate::utils::try_alloc_zeroed_f64;

/// Square `n × n` matrix of `f64` in one contiguous row-major buffer.
///
/// Element `(i, j)` lives at `data[i * n + j]`. Rows are exposed as bounded
/// slices through [`row`](Self::row) and [`row_mut`](Self::row_mut).
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Allocates a zero-filled `n × n` matrix.
    ///
    /// # Errors
    ///
    /// `AllocationError` if `n == 0`, if `n * n * 8` overflows, or if the
    /// allocator cannot provide the buffer.
    pub fn zeros(n: usize) -> Result<Self> {
        let len = element_count(n)?;
        let data = try_alloc_zeroed_f64(len)?;
        Ok(Self { n, data })
    }

    /// Allocates an `n × n` matrix and fills it from the seeded stream.
    pub fn random(n: usize, seed: u64) -> Result<Self> {
        let mut m = Self::zeros(n)?;
        m.fill_seeded(seed);
        Ok(m)
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `data.len() != n * n`, `AllocationError` if
    /// `n == 0`.
    pub fn from_vec(n: usize, data: Vec<f64>) -> Result<Self> {
        let len = element_count(n)?;
        if data.len() != len {
            return Err(dimension_mismatch(format!(
                "expected {}x{}={} elements, got {}",
                n,
                n,
                len,
                data.len()
            )));
        }
        Ok(Self { n, data })
    }

    /// Builds a matrix from nested rows, mainly for small fixed examples.
    pub fn from_rows(rows: &[&[f64]]) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(dimension_mismatch(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(n, data)
    }

    /// Overwrites every element with a uniform `[0, 1)` draw from `seed`.
    ///
    /// Filling twice with the same seed yields bit-identical matrices.
    pub fn fill_seeded(&mut self, seed: u64) {
        super::generate::fill_dense(self, seed);
    }

    /// Side length `n`.
    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Row `i` as a slice of length `n`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.n, "row {} out of bounds for {}x{}", i, self.n, self.n);
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Mutable row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n`.
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        assert!(i < self.n, "row {} out of bounds for {}x{}", i, self.n, self.n);
        let n = self.n;
        &mut self.data[i * n..(i + 1) * n]
    }

    /// Element `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.row(i)[j]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Bytes held by the element buffer.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f64>()
    }

    /// Largest element-wise relative difference against `other`.
    ///
    /// Each difference is scaled by `max(|a|, |b|, 1)` so values near zero
    /// are compared absolutely.
    pub fn max_relative_diff(&self, other: &DenseMatrix) -> Result<f64> {
        if self.n != other.n {
            return Err(dimension_mismatch(format!(
                "cannot compare {}x{} with {}x{}",
                self.n, self.n, other.n, other.n
            )));
        }
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs() / a.abs().max(b.abs()).max(1.0))
            .fold(0.0, f64::max))
    }
}

fn element_count(n: usize) -> Result<usize> {
    if n == 0 {
        return Err(allocation_error(0, "matrix dimension must be positive"));
    }
    n.checked_mul(n)
        .filter(|len| len.checked_mul(std::mem::size_of::<f64>()).is_some())
        .ok_or_else(|| allocation_error(usize::MAX, format!("{}x{} matrix overflows usize", n, n)))
}

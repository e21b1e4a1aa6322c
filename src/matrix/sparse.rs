use crate::error::{dimension_mismatch, Result};

/// Square `n × n` matrix in compressed sparse row form.
///
/// Row `i` owns entries `row_ptr[i]..row_ptr[i + 1]` of `col_idx` and
/// `values`. Column indices within a row are unordered and may repeat;
/// repeated entries simply add during multiplication.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Assembles a CSR matrix, checking the structural invariant:
    ///
    /// - `row_ptr.len() == n + 1`, `row_ptr[0] == 0`, non-decreasing
    /// - `row_ptr[n] == col_idx.len() == values.len()`
    /// - every column index is `< n`
    pub fn from_parts(
        n: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if row_ptr.len() != n + 1 {
            return Err(dimension_mismatch(format!(
                "row_ptr has {} entries, expected {}",
                row_ptr.len(),
                n + 1
            )));
        }
        if row_ptr[0] != 0 {
            return Err(dimension_mismatch("row_ptr must start at 0"));
        }
        if let Some(i) = row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(dimension_mismatch(format!(
                "row_ptr decreases between rows {} and {}",
                i,
                i + 1
            )));
        }
        let nnz = row_ptr[n];
        if col_idx.len() != nnz || values.len() != nnz {
            return Err(dimension_mismatch(format!(
                "row_ptr[n] = {} but col_idx has {} and values has {} entries",
                nnz,
                col_idx.len(),
                values.len()
            )));
        }
        if let Some(&bad) = col_idx.iter().find(|&&j| j >= n) {
            return Err(dimension_mismatch(format!(
                "column index {} out of range for n = {}",
                bad, n
            )));
        }
        Ok(Self {
            n,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Built by the generator, which upholds the invariant by construction.
    pub(crate) fn from_parts_unchecked(
        n: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(row_ptr.len(), n + 1);
        debug_assert_eq!(row_ptr[n], col_idx.len());
        debug_assert_eq!(col_idx.len(), values.len());
        Self {
            n,
            row_ptr,
            col_idx,
            values,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of stored entries, duplicates included.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries over `n * n`.
    pub fn density(&self) -> f64 {
        self.nnz() as f64 / (self.n as f64 * self.n as f64)
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn memory_bytes(&self) -> usize {
        (self.row_ptr.len() + self.col_idx.len()) * std::mem::size_of::<usize>()
            + self.values.len() * std::mem::size_of::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_valid() {
        // [ 0 2 ]
        // [ 3 0 ]
        let s = SparseMatrix::from_parts(2, vec![0, 1, 2], vec![1, 0], vec![2.0, 3.0]).unwrap();
        assert_eq!(s.nnz(), 2);
        assert_eq!(s.row(0), (&[1usize][..], &[2.0][..]));
        assert_eq!(s.row(1), (&[0usize][..], &[3.0][..]));
        assert!((s.density() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_from_parts_rejects_broken_invariants() {
        // wrong row_ptr length
        assert!(SparseMatrix::from_parts(2, vec![0, 1], vec![0], vec![1.0]).is_err());
        // decreasing row_ptr
        assert!(SparseMatrix::from_parts(2, vec![0, 2, 1], vec![0], vec![1.0]).is_err());
        // nnz mismatch
        assert!(SparseMatrix::from_parts(2, vec![0, 1, 2], vec![0], vec![1.0]).is_err());
        // column out of range
        assert!(SparseMatrix::from_parts(2, vec![0, 1, 1], vec![2], vec![1.0]).is_err());
    }

    #[test]
    fn test_empty_rows_and_duplicates_allowed() {
        let s = SparseMatrix::from_parts(3, vec![0, 0, 2, 2], vec![1, 1], vec![1.0, 2.0]).unwrap();
        assert_eq!(s.row(0).0.len(), 0);
        assert_eq!(s.row(1).0, &[1, 1]);
        assert_eq!(s.row(2).0.len(), 0);
    }
}

//! Seeded operand generation.
//!
//! Both generators draw from `StdRng::seed_from_u64(seed)`, so a given seed
//! reproduces the same matrix bit for bit for a fixed `rand` version.

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{DenseMatrix, SparseMatrix};
use crate::error::{allocation_error, configuration_error, Result};
use crate::utils::try_vec_with_capacity;

/// Fills `m` in row-major order with uniform `[0, 1)` values from `seed`.
pub fn fill_dense(m: &mut DenseMatrix, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    m.as_mut_slice()
        .iter_mut()
        .for_each(|x| *x = rng.random::<f64>());
}

/// Checks that `density` is a finite fraction in `[0, 1]`.
pub fn validate_density(density: f64) -> Result<()> {
    if !density.is_finite() || !(0.0..=1.0).contains(&density) {
        return Err(configuration_error(format!(
            "density must lie in [0, 1], got {}",
            density
        )));
    }
    Ok(())
}

/// Generates an `n × n` CSR matrix with about `round(n * n * density)`
/// entries.
///
/// Entries are spread as evenly as possible: every row gets `nnz / n`, and
/// the first `nnz % n` rows get one more, capped at `n` per row. Columns are
/// drawn uniformly; a short linear scan steps past columns already taken in
/// the same row, but duplicates can still occur and are left in place.
///
/// # Errors
///
/// `ConfigurationError` for a density outside `[0, 1]` (checked before any
/// allocation), `AllocationError` for `n == 0` or when the entry arrays
/// cannot be allocated.
pub fn generate_sparse(n: usize, density: f64, seed: u64) -> Result<SparseMatrix> {
    validate_density(density)?;
    if n == 0 {
        return Err(allocation_error(0, "matrix dimension must be positive"));
    }

    let target = (n as f64 * n as f64 * density).round() as usize;
    let per = target / n;
    let left = target - per * n;

    let ptr_len = n
        .checked_add(1)
        .ok_or_else(|| allocation_error(usize::MAX, "CSR row pointer count overflows usize"))?;
    let mut row_ptr = try_vec_with_capacity::<usize>(ptr_len)?;
    let mut col_idx = try_vec_with_capacity::<usize>(target)?;
    let mut values = try_vec_with_capacity::<f64>(target)?;

    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..n {
        let row_start = col_idx.len();
        row_ptr.push(row_start);

        let k = (per + usize::from(i < left)).min(n);
        for _ in 0..k {
            let mut j = rng.random_range(0..n);
            let mut attempts = 0;
            while attempts < k && col_idx[row_start..].contains(&j) {
                j = (j + 1) % n;
                attempts += 1;
            }
            col_idx.push(j);
            values.push(rng.random::<f64>());
        }
    }
    row_ptr.push(col_idx.len());

    debug!(
        "generated {}x{} CSR: target nnz {}, stored {}",
        n,
        n,
        target,
        col_idx.len()
    );

    Ok(SparseMatrix::from_parts_unchecked(n, row_ptr, col_idx, values))
}

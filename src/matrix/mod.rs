//! Matrix storage and seeded generation.
//!
//! Dense matrices are one contiguous row-major buffer with row views; the
//! sparse left operand is stored in compressed sparse row (CSR) form.

pub mod dense;
pub mod generate;
pub mod sparse;

pub use dense::DenseMatrix;
pub use generate::{fill_dense, generate_sparse};
pub use sparse::SparseMatrix;

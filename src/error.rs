//! Error types for matbench operations.
//!
//! Kernels, generators and the scheduler return these instead of panicking,
//! so the benchmark driver can decide whether a failure skips one matrix size
//! or ends the whole run.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while generating operands, multiplying or scheduling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatBenchError {
    /// Matrix storage could not be obtained.
    #[error("Memory allocation failed: {message} (requested {requested_bytes} bytes)")]
    AllocationError {
        /// The number of bytes that was requested.
        requested_bytes: usize,
        /// Human-readable error message.
        message: String,
    },
    /// A benchmark or kernel parameter is out of range.
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        /// Human-readable error message.
        message: String,
    },
    /// Operand shapes do not agree.
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch {
        /// Human-readable error message.
        message: String,
    },
    /// A worker thread failed while computing its rows.
    #[error("Worker {worker} failed: {message}")]
    WorkerFailure {
        /// Index of the failing worker inside the pool.
        worker: usize,
        /// Panic payload or failure description.
        message: String,
    },
    /// The parallel multiply did not finish in time and was abandoned.
    #[error(
        "Parallel multiply hung: {rows_completed}/{rows_total} rows done after {timeout:?}"
    )]
    Timeout {
        /// The wait budget that elapsed.
        timeout: Duration,
        /// Rows finished before the run was abandoned.
        rows_completed: usize,
        /// Rows in the output matrix.
        rows_total: usize,
    },
}

impl MatBenchError {
    /// Returns `true` for failures the driver may skip past.
    ///
    /// Only allocation failures are recoverable: the size is dropped and the
    /// remaining sizes still run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MatBenchError::AllocationError { .. })
    }
}

/// Result type alias for matbench operations.
pub type Result<T> = std::result::Result<T, MatBenchError>;

/// Creates an allocation error.
pub fn allocation_error(requested_bytes: usize, message: impl Into<String>) -> MatBenchError {
    MatBenchError::AllocationError {
        requested_bytes,
        message: message.into(),
    }
}

/// Creates a configuration error.
pub fn configuration_error(message: impl Into<String>) -> MatBenchError {
    MatBenchError::ConfigurationError {
        message: message.into(),
    }
}

/// Creates a dimension mismatch error.
pub fn dimension_mismatch(message: impl Into<String>) -> MatBenchError {
    MatBenchError::DimensionMismatch {
        message: message.into(),
    }
}

/// Creates a worker failure error.
pub fn worker_failure(worker: usize, message: impl Into<String>) -> MatBenchError {
    MatBenchError::WorkerFailure {
        worker,
        message: message.into(),
    }
}

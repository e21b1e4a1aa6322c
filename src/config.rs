//! Validated benchmark configuration.

use std::time::Duration;

use crate::error::{configuration_error, Result};
use crate::kernels::{Kernel, KernelParams};
use crate::matrix::generate::validate_density;
use crate::parallel::{DispenserKind, SchedulerConfig};
use crate::{BASE_SEED, DEFAULT_BLOCK_SIZE, DEFAULT_DENSITY, DEFAULT_REPEATS, DEFAULT_TIMEOUT};

/// Everything one benchmark run needs, checked once by [`validate`](Self::validate)
/// before any matrix is allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Matrix side lengths, benchmarked in the given order.
    pub sizes: Vec<usize>,
    /// Worker count. `1` runs on the calling thread and records the baseline.
    pub threads: usize,
    /// Timed multiplications per size.
    pub repeats: usize,
    pub kernel: Kernel,
    pub block_size: usize,
    pub density: f64,
    /// Seed for A; B uses `seed + 1`.
    pub seed: u64,
    /// Wait budget for one parallel multiplication.
    pub timeout: Duration,
    /// Cap on simultaneously computing workers.
    pub max_active: Option<usize>,
    pub dispenser: DispenserKind,
}

impl BenchConfig {
    /// A single-thread configuration with default knobs.
    pub fn new(kernel: Kernel, sizes: Vec<usize>) -> Self {
        Self {
            sizes,
            threads: 1,
            repeats: DEFAULT_REPEATS,
            kernel,
            block_size: DEFAULT_BLOCK_SIZE,
            density: DEFAULT_DENSITY,
            seed: BASE_SEED,
            timeout: DEFAULT_TIMEOUT,
            max_active: None,
            dispenser: DispenserKind::default(),
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Rejects the first out-of-range field.
    ///
    /// A size of 0 passes: it fails later with `AllocationError`, which the
    /// driver skips like any other size it cannot allocate.
    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(configuration_error("at least one matrix size is required"));
        }
        if self.threads == 0 {
            return Err(configuration_error("thread count must be at least 1"));
        }
        if self.repeats == 0 {
            return Err(configuration_error("repeat count must be at least 1"));
        }
        if self.block_size == 0 {
            return Err(configuration_error("block size must be positive"));
        }
        validate_density(self.density)?;
        if self.max_active == Some(0) {
            return Err(configuration_error("max active workers must be at least 1"));
        }
        Ok(())
    }

    pub fn kernel_params(&self) -> KernelParams {
        KernelParams {
            block_size: self.block_size,
            density: self.density,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            threads: self.threads,
            max_active: self.max_active,
            timeout: self.timeout,
            dispenser: self.dispenser,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatBenchError;

    fn valid() -> BenchConfig {
        BenchConfig::new(Kernel::Basic, vec![16, 32])
    }

    fn assert_rejected(config: BenchConfig, needle: &str) {
        match config.validate() {
            Err(MatBenchError::ConfigurationError { message }) => {
                assert!(message.contains(needle), "{:?} lacks {:?}", message, needle)
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = valid();
        config.validate().unwrap();
        assert_eq!(config.threads, 1);
        assert_eq!(config.repeats, 3);
        assert_eq!(config.seed, 403086);
        assert_eq!(config.kernel_params(), KernelParams::default());
    }

    #[test]
    fn test_each_field_rejected() {
        assert_rejected(BenchConfig::new(Kernel::Basic, vec![]), "at least one");
        assert_rejected(valid().with_threads(0), "thread");
        assert_rejected(valid().with_repeats(0), "repeat");
        assert_rejected(
            BenchConfig {
                block_size: 0,
                ..valid()
            },
            "block",
        );
        assert_rejected(
            BenchConfig {
                density: -0.1,
                ..valid()
            },
            "density",
        );
        assert_rejected(
            BenchConfig {
                density: f64::NAN,
                ..valid()
            },
            "density",
        );
        assert_rejected(
            BenchConfig {
                max_active: Some(0),
                ..valid()
            },
            "max active",
        );
    }

    #[test]
    fn test_zero_size_left_to_driver() {
        BenchConfig::new(Kernel::Basic, vec![8, 0, 6])
            .validate()
            .unwrap();
    }

    #[test]
    fn test_scheduler_config_carries_fields() {
        let config = BenchConfig {
            max_active: Some(2),
            timeout: Duration::from_secs(5),
            ..valid().with_threads(4)
        };
        let sched = config.scheduler_config();
        assert_eq!(sched.threads, 4);
        assert_eq!(sched.max_active, Some(2));
        assert_eq!(sched.timeout, Duration::from_secs(5));
    }
}

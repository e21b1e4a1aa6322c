use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use matbench::kernels::Kernel;
use matbench::parallel::DispenserKind;
use matbench::report::ReportFormat;
use matbench::{BenchConfig, BASE_SEED, DEFAULT_BLOCK_SIZE, DEFAULT_DENSITY, DEFAULT_REPEATS};

/// Square matrix-multiplication microbenchmarks.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Kernel to benchmark.
    #[arg(value_enum)]
    pub kernel: Kernel,

    /// Matrix side lengths, run in the order given.
    #[arg(required = true, num_args = 1..)]
    pub sizes: Vec<usize>,

    /// Worker thread counts. Several values run in ascending order so the
    /// single-thread run provides the speedup baseline for the others.
    #[arg(short = 'p', long = "threads", num_args = 1.., default_value = "1")]
    pub threads: Vec<usize>,

    /// Timed repeats per size.
    #[arg(short, long, default_value_t = DEFAULT_REPEATS)]
    pub repeats: usize,

    /// Tile side of the blocked kernel.
    #[arg(long = "block", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Non-zero fraction of the sparse operand.
    #[arg(long, default_value_t = DEFAULT_DENSITY)]
    pub density: f64,

    #[arg(long, default_value_t = BASE_SEED)]
    pub seed: u64,

    /// Seconds a parallel multiplication may take before it counts as hung.
    #[arg(long, default_value_t = 3600)]
    pub timeout_secs: u64,

    /// Cap on simultaneously computing workers.
    #[arg(long)]
    pub max_active: Option<usize>,

    #[arg(long, value_enum, default_value_t = DispenserKind::Atomic)]
    pub dispenser: DispenserKind,

    /// Directory for CSV reports.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// CSV layout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Parallel)]
    pub report: ReportFormat,

    /// Skip writing CSV reports.
    #[arg(long)]
    pub no_csv: bool,
}

impl CliArgs {
    /// Thread counts ascending, without duplicates.
    pub fn thread_counts(&self) -> Vec<usize> {
        let mut threads = self.threads.clone();
        threads.sort_unstable();
        threads.dedup();
        threads
    }

    /// One configuration per thread count, in run order.
    pub fn bench_configs(&self) -> Vec<BenchConfig> {
        self.thread_counts()
            .into_iter()
            .map(|threads| BenchConfig {
                sizes: self.sizes.clone(),
                threads,
                repeats: self.repeats,
                kernel: self.kernel,
                block_size: self.block_size,
                density: self.density,
                seed: self.seed,
                timeout: Duration::from_secs(self.timeout_secs),
                max_active: self.max_active,
                dispenser: self.dispenser,
            })
            .collect()
    }
}

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use matbench::report::{print_summary, save_csv, ReportFormat};
use matbench::{BaselineCache, BenchmarkResult, Driver};

use crate::cli::CliArgs;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let mut baselines = BaselineCache::new();
    let mut all_results: Vec<BenchmarkResult> = Vec::new();

    for config in args.bench_configs() {
        let threads = config.threads;
        let mut driver = Driver::new(config)
            .with_context(|| format!("invalid configuration for {} threads", threads))?
            .with_baselines(baselines);

        let report = driver
            .run()
            .with_context(|| format!("{} benchmark with {} threads failed", args.kernel, threads))?;
        baselines = driver.into_baselines();

        if !report.skipped.is_empty() {
            let sizes: Vec<usize> = report.skipped.iter().map(|s| s.n).collect();
            info!("{} threads: skipped sizes {:?}", threads, sizes);
        }

        if !args.no_csv && args.report == ReportFormat::Parallel {
            write_report(&args, threads, &report.results)?;
        }
        all_results.extend(report.results);
    }

    if !args.no_csv && args.report == ReportFormat::KernelComparison {
        let threads = args.thread_counts().last().copied().unwrap_or(1);
        write_report(&args, threads, &all_results)?;
    }

    print_summary(&all_results);
    Ok(())
}

fn write_report(args: &CliArgs, threads: usize, results: &[BenchmarkResult]) -> Result<()> {
    let path = save_csv(&args.output_dir, args.report, args.kernel, threads, results)
        .with_context(|| format!("cannot write report into {}", args.output_dir.display()))?;
    println!("Saved {}", path.display());
    Ok(())
}

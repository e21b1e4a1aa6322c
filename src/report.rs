//! CSV reports and the console summary.
//!
//! Two layouts exist. The parallel layout tracks scaling across thread
//! counts; the kernel-comparison layout tracks one kernel across sizes and
//! records its knobs in a quoted `extra` column. File names embed a local
//! timestamp so repeated runs never overwrite each other.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::ValueEnum;

use crate::driver::BenchmarkResult;
use crate::kernels::Kernel;

/// Value of the `lang` column.
pub const LANG: &str = "rust";

pub const PARALLEL_HEADER: &str =
    "lang,size,threads,repeats,avg_time_ms,speedup,efficiency,memory_mb";

pub const KERNEL_HEADER: &str = "lang,algo,size,repeats,avg_time_ms,heap_now_mb,extra";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One row per size with speedup and efficiency.
    #[default]
    Parallel,
    /// One row per size with the kernel name and its parameters.
    #[value(name = "kernels")]
    KernelComparison,
}

impl ReportFormat {
    pub fn header(self) -> &'static str {
        match self {
            ReportFormat::Parallel => PARALLEL_HEADER,
            ReportFormat::KernelComparison => KERNEL_HEADER,
        }
    }

    pub fn format_row(self, r: &BenchmarkResult) -> String {
        match self {
            ReportFormat::Parallel => format!(
                "{},{},{},{},{:.3},{:.3},{:.3},{:.2}",
                LANG,
                r.n,
                r.threads,
                r.repeats,
                r.mean_ms(),
                r.speedup,
                r.efficiency,
                r.memory_mb()
            ),
            ReportFormat::KernelComparison => format!(
                "{},{},{},{},{:.3},{:.2},\"{{block:{},density:{:.3}}}\"",
                LANG,
                r.kernel,
                r.n,
                r.repeats,
                r.mean_ms(),
                r.memory_mb(),
                r.block_size,
                r.density
            ),
        }
    }

    /// `results_rust_parallel_{threads}threads_{ts}.csv` or
    /// `results_rust_opt_{kernel}_{ts}.csv`.
    pub fn file_name(self, kernel: Kernel, threads: usize, at: &DateTime<Local>) -> String {
        let ts = timestamp(at);
        match self {
            ReportFormat::Parallel => {
                format!("results_{}_parallel_{}threads_{}.csv", LANG, threads, ts)
            }
            ReportFormat::KernelComparison => {
                format!("results_{}_opt_{}_{}.csv", LANG, kernel, ts)
            }
        }
    }
}

/// `%Y%m%d_%H%M%S` in local time.
pub fn timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Writes the header and one row per result.
pub fn write_csv<W: Write>(
    mut out: W,
    format: ReportFormat,
    results: &[BenchmarkResult],
) -> io::Result<()> {
    writeln!(out, "{}", format.header())?;
    for r in results {
        writeln!(out, "{}", format.format_row(r))?;
    }
    out.flush()
}

/// Creates a timestamped report file in `dir` and returns its path.
pub fn save_csv(
    dir: &Path,
    format: ReportFormat,
    kernel: Kernel,
    threads: usize,
    results: &[BenchmarkResult],
) -> io::Result<PathBuf> {
    let path = dir.join(format.file_name(kernel, threads, &Local::now()));
    let file = File::create(&path)?;
    write_csv(BufWriter::new(file), format, results)?;
    Ok(path)
}

/// Console table of all results, grouped in run order.
pub fn render_summary(results: &[BenchmarkResult]) -> String {
    let rule = "=".repeat(106);
    let mut s = String::new();
    let _ = writeln!(s, "\n{}\nSUMMARY\n{}", rule, rule);
    let _ = writeln!(
        s,
        "{:<12} {:>7} {:>8} {:>12} {:>10} {:>9} {:>9} {:>11} {:>9} {:>9}",
        "Kernel",
        "Size",
        "Threads",
        "Mean (ms)",
        "SD (ms)",
        "GFLOPS",
        "Speedup",
        "Efficiency",
        "Mem (MB)",
        "Peak (MB)"
    );
    let _ = writeln!(s, "{}", "-".repeat(106));
    for r in results {
        let _ = writeln!(
            s,
            "{:<12} {:>7} {:>8} {:>12.3} {:>10.3} {:>9.2} {:>8.2}x {:>11.3} {:>9.2} {:>9}",
            r.kernel.name(),
            r.n,
            r.threads,
            r.mean_ms(),
            r.std_dev_ms,
            gflops(r),
            r.speedup,
            r.efficiency,
            r.memory_mb(),
            r.peak_resident_mb
                .map_or_else(|| "-".to_string(), |mb| format!("{:.2}", mb))
        );
    }
    let _ = writeln!(s, "{}", rule);
    let _ = writeln!(
        s,
        "GFLOPS assume 2n^3 operations (dense equivalent for the sparse kernel)."
    );
    s
}

pub fn print_summary(results: &[BenchmarkResult]) {
    print!("{}", render_summary(results));
}

fn gflops(r: &BenchmarkResult) -> f64 {
    let secs = r.mean.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    let n = r.n as f64;
    2.0 * n * n * n / secs / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn sample(kernel: Kernel, threads: usize) -> BenchmarkResult {
        BenchmarkResult {
            kernel,
            n: 512,
            threads,
            repeats: 3,
            samples: vec![Duration::from_micros(12_345_678); 3],
            mean: Duration::from_micros(12_345_678),
            std_dev_ms: 0.0,
            speedup: 3.5,
            efficiency: 3.5 / threads as f64,
            resident_mb: Some(42.127),
            peak_resident_mb: Some(57.5),
            working_set_mb: 6.29,
            block_size: 64,
            density: 0.05,
        }
    }

    #[test]
    fn test_parallel_row() {
        let row = ReportFormat::Parallel.format_row(&sample(Kernel::Basic, 4));
        assert_eq!(row, "rust,512,4,3,12345.678,3.500,0.875,42.13");
        assert_eq!(row.split(',').count(), PARALLEL_HEADER.split(',').count());
    }

    #[test]
    fn test_kernel_row() {
        let mut r = sample(Kernel::Sparse, 1);
        r.resident_mb = None;
        let row = ReportFormat::KernelComparison.format_row(&r);
        assert_eq!(
            row,
            "rust,sparse,512,3,12345.678,6.29,\"{block:64,density:0.050}\""
        );
        // the quoted extra column holds one comma of its own
        assert_eq!(row.split(',').count(), KERNEL_HEADER.split(',').count() + 1);
    }

    #[test]
    fn test_file_names() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(timestamp(&at), "20240307_090501");
        assert_eq!(
            ReportFormat::Parallel.file_name(Kernel::Basic, 8, &at),
            "results_rust_parallel_8threads_20240307_090501.csv"
        );
        assert_eq!(
            ReportFormat::KernelComparison.file_name(Kernel::Blocked, 1, &at),
            "results_rust_opt_blocked_20240307_090501.csv"
        );
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        let results = [sample(Kernel::Basic, 1), sample(Kernel::Basic, 2)];
        write_csv(&mut buf, ReportFormat::Parallel, &results).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PARALLEL_HEADER);
        assert!(lines[2].starts_with("rust,512,2,3,"));
    }

    #[test]
    fn test_summary_lists_every_result() {
        let results = [sample(Kernel::Transposed, 1), sample(Kernel::Transposed, 2)];
        let summary = render_summary(&results);
        assert_eq!(summary.matches("transposed").count(), 2);
        assert!(summary.contains("SUMMARY"));
    }

    #[test]
    fn test_summary_shows_peak_memory() {
        let mut missing = sample(Kernel::Basic, 2);
        missing.peak_resident_mb = None;
        let summary = render_summary(&[sample(Kernel::Basic, 1), missing]);
        assert!(summary.contains("Peak (MB)"));

        let rows: Vec<&str> = summary.lines().filter(|l| l.starts_with("basic")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].ends_with("     57.50"), "{:?}", rows[0]);
        assert!(rows[1].ends_with("         -"), "{:?}", rows[1]);
    }
}

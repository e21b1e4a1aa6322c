//! Kernel and scheduler benchmarks.
//!
//! # Usage:
//! ```bash
//! # Run every group
//! cargo bench --bench kernels
//!
//! # Run one group
//! cargo bench --bench kernels -- serial_kernels
//! cargo bench --bench kernels -- parallel_scaling
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use matbench::kernels::{multiply, Kernel, KernelParams, Operands};
use matbench::parallel::ParallelScheduler;
use matbench::BASE_SEED;

fn configure_criterion() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(3))
        .sample_size(20)
}

/// Every kernel on one thread across a few sizes.
fn bench_serial_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("serial_kernels");
    let params = KernelParams::default();

    for n in [64, 128, 256] {
        group.throughput(Throughput::Elements((2 * n * n * n) as u64));
        for kernel in Kernel::ALL {
            let Ok(ops) = Operands::generate(kernel, n, &params, BASE_SEED) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new(kernel.name(), n), &ops, |b, ops| {
                b.iter(|| multiply(kernel, black_box(ops), &params, None))
            });
        }
    }

    group.finish();
}

/// Block-size sweep for the tiled kernel.
fn bench_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_sizes");
    let n = 256;
    let Ok(ops) = Operands::generate(Kernel::Blocked, n, &KernelParams::default(), BASE_SEED)
    else {
        return;
    };

    for block_size in [16, 32, 64, 128] {
        let params = KernelParams {
            block_size,
            ..KernelParams::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &ops, |b, ops| {
            b.iter(|| multiply(Kernel::Blocked, black_box(ops), &params, None))
        });
    }

    group.finish();
}

/// Naive kernel through pools of increasing size.
fn bench_parallel_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_scaling");
    let n = 256;
    let params = KernelParams::default();
    let Ok(ops) = Operands::generate(Kernel::Basic, n, &params, BASE_SEED) else {
        return;
    };

    let max_threads = std::thread::available_parallelism().map_or(4, |p| p.get());
    let mut threads = 1;
    while threads <= max_threads {
        if let Ok(pool) = ParallelScheduler::with_threads(threads) {
            group.bench_with_input(BenchmarkId::from_parameter(threads), &ops, |b, ops| {
                b.iter(|| multiply(Kernel::Basic, black_box(ops), &params, Some(&pool)))
            });
        }
        threads *= 2;
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = configure_criterion();
    targets = bench_serial_kernels, bench_block_sizes, bench_parallel_scaling
);
criterion_main!(benches);

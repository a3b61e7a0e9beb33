//! Observe hot-path benchmarks.

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scrapehist::metrics::HistogramRegistry;

fn bench_observe_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe/single");

    for sampled in [false, true] {
        let registry = HistogramRegistry::with_capacity(1);
        let h = registry.register("bench", sampled).unwrap();
        let mut v = 0u64;

        group.bench_with_input(BenchmarkId::new("sampled", sampled), &sampled, |b, _| {
            b.iter(|| {
                v = v.wrapping_add(7919);
                registry.observe(h, black_box(v));
            });
        });
    }

    group.finish();
}

fn bench_observe_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe/contended");

    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let registry = Arc::new(HistogramRegistry::with_capacity(1));
            let h = registry.register("bench", false).unwrap();

            b.iter(|| {
                let workers: Vec<_> = (0..threads)
                    .map(|t| {
                        let registry = Arc::clone(&registry);
                        thread::spawn(move || {
                            for i in 0..10_000u64 {
                                registry.observe(h, i ^ t as u64);
                            }
                        })
                    })
                    .collect();
                for w in workers {
                    w.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let registry = HistogramRegistry::with_capacity(64);
    let handles: Vec<_> = (0..64)
        .map(|i| registry.register(&format!("h{i}"), false).unwrap())
        .collect();

    c.bench_function("export/aggregates_64", |b| {
        b.iter(|| {
            for &h in &handles {
                registry.observe(h, 1);
            }
            black_box(registry.export_aggregates());
        });
    });
}

criterion_group!(
    benches,
    bench_observe_single_thread,
    bench_observe_contended,
    bench_extract
);
criterion_main!(benches);

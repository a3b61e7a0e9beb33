//! Concurrency tests for the histogram engine.
//!
//! These tests verify that no observation is lost or double counted while
//! scrapes retire intervals underneath running observers.
//! Run with: cargo test --test concurrency_tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use scrapehist::metrics::HistogramRegistry;

/// N observers against one histogram, one scraper looping export.
#[test]
fn parallel_observe_with_scrapes_loses_nothing() {
    let registry = Arc::new(HistogramRegistry::with_capacity(4));
    let h = registry.register("contended", false).unwrap();
    let num_threads = 8u64;
    let per_thread = 20_000u64;

    let done = Arc::new(AtomicBool::new(false));
    let scraper = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut count = 0u64;
            let mut total = 0u64;
            let mut scrapes = 0u64;
            while !done.load(Ordering::Acquire) {
                let aggs = registry.export_aggregates();
                let snap = &aggs["contended"];
                if snap.count > 0 {
                    assert!(snap.min <= snap.max);
                    assert!(snap.kept <= snap.count);
                }
                count += snap.count;
                total += snap.total;
                scrapes += 1;
            }
            (count, total, scrapes)
        })
    };

    let observers: Vec<_> = (0..num_threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 1..=per_thread {
                    registry.observe(h, i);
                }
            })
        })
        .collect();

    for o in observers {
        o.join().unwrap();
    }
    done.store(true, Ordering::Release);
    let (mut count, mut total, scrapes) = scraper.join().unwrap();

    // whatever is left in the primary
    let aggs = registry.export_aggregates();
    let rest = &aggs["contended"];
    count += rest.count;
    total += rest.total;

    assert!(scrapes > 0);
    assert_eq!(count, num_threads * per_thread);
    assert_eq!(total, num_threads * per_thread * (per_thread + 1) / 2);
}

/// Sampled histograms keep exact aggregates under contention.
#[test]
fn sampled_histogram_counts_every_observation() {
    let registry = Arc::new(HistogramRegistry::with_capacity(4));
    let h = registry.register("sampled", true).unwrap();
    let num_threads = 4u64;
    let per_thread = 10_000u64;

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    registry.observe(h, 3);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let n = num_threads * per_thread;
    let aggs = registry.export_aggregates();
    let snap = &aggs["sampled"];
    assert_eq!(snap.count, n);
    assert_eq!(snap.total, 3 * n);
    assert_eq!(snap.kept, n.div_ceil(4));
}

/// Bucket counts are cumulative and exact once all observers are done.
#[test]
fn bucket_counts_survive_scrapes() {
    let registry = Arc::new(HistogramRegistry::with_capacity(4));
    let h = registry.register("buckets", false).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    registry.observe(h, 0);
                    registry.observe(h, u64::MAX);
                }
                registry.export_aggregates();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let exported = registry.export_bucket_histograms();
    let buckets = &exported["buckets"];
    assert_eq!(buckets[64], 20_000);
    assert_eq!(buckets[0], 20_000);
    assert_eq!(buckets.iter().sum::<u64>(), 40_000);
}

/// Concurrent registration hands out unique, dense handles.
#[test]
fn parallel_registration_unique_handles() {
    let registry = Arc::new(HistogramRegistry::with_capacity(64));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..8)
                    .map(|i| registry.register(&format!("t{t}_{i}"), false).unwrap().index())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all: Vec<u32> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..64).collect::<Vec<u32>>());
    assert!(registry.register("one_too_many", false).is_err());
}

//! Double-buffered interval aggregates.
//!
//! Each histogram owns two [`AggregateBuffer`]s. One is the primary and
//! receives observations; the other holds the last finished interval. A
//! scrape flips the roles and resets the new primary, so pulling an interval
//! out is an index flip and a handful of stores, with no copying and no
//! allocation. The sample arrays are allocated once and reused forever.
//!
//! Locking is inverted from the usual reader/writer naming: `observe` takes
//! the role lock *shared* (any number of observers mutate atomics in
//! parallel) and `extract_and_reset` takes it *exclusive*, so no observation
//! can be half-applied to a buffer while it is being retired.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};

use super::export::AggregateSnapshot;
use super::extremum::AtomicExtremum;

/// Slots in each buffer's sample window.
pub const SAMPLE_CAPACITY: usize = 1 << 15;

/// Index mask for the sample window.
const SAMPLE_MASK: u64 = SAMPLE_CAPACITY as u64 - 1;

/// With sampling enabled, one observation in this many is retained.
pub const SAMPLE_EVERY: u64 = 4;

/// Sentinel held by `min` while an interval has no observations.
pub const MIN_SENTINEL: u64 = u64::MAX;

/// One interval's worth of count / sum / extremes / raw samples.
///
/// `samples` is an overwrite-oldest window: the i-th retained value goes to
/// slot `i % SAMPLE_CAPACITY`. It is not a uniform random reservoir; once an
/// interval retains more than `SAMPLE_CAPACITY` values, only the most recent
/// ones survive.
pub struct AggregateBuffer {
    count: AtomicU64,
    kept: AtomicU64,
    total: AtomicU64,
    min: AtomicExtremum,
    max: AtomicExtremum,
    samples: Box<[AtomicU64]>,
}

impl Default for AggregateBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateBuffer {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            kept: AtomicU64::new(0),
            total: AtomicU64::new(0),
            min: AtomicExtremum::new(MIN_SENTINEL),
            max: AtomicExtremum::new(0),
            samples: (0..SAMPLE_CAPACITY).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    #[inline]
    fn observe(&self, value: u64, sampled: bool) {
        // total wraps on overflow
        self.total.fetch_add(value, Ordering::Relaxed);
        self.max.update_max(value);
        self.min.update_min(value);

        let seen = self.count.fetch_add(1, Ordering::Relaxed);
        if sampled && seen % SAMPLE_EVERY != 0 {
            return;
        }

        let slot = self.kept.fetch_add(1, Ordering::Relaxed) & SAMPLE_MASK;
        self.samples[slot as usize].store(value, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.kept.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
        self.max.store(0);
        self.min.store(MIN_SENTINEL);
    }
}

/// The pair of buffers behind one registered histogram.
pub struct HistogramStore {
    /// Index into `buffers` of the current primary.
    primary: RwLock<usize>,
    /// Held for as long as an [`Interval`] borrows the secondary buffer.
    extraction: Mutex<()>,
    buffers: [AggregateBuffer; 2],
    sampled: bool,
}

impl HistogramStore {
    pub fn new(sampled: bool) -> Self {
        Self {
            primary: RwLock::new(0),
            extraction: Mutex::new(()),
            buffers: [AggregateBuffer::new(), AggregateBuffer::new()],
            sampled,
        }
    }

    pub fn sampled(&self) -> bool {
        self.sampled
    }

    /// Record one observation into the primary buffer.
    ///
    /// Blocks only while an extraction is flipping buffers.
    #[inline]
    pub fn observe(&self, value: u64) {
        let primary = self.primary.read();
        self.buffers[*primary].observe(value, self.sampled);
    }

    /// Retire the current primary and start a fresh interval.
    ///
    /// The returned [`Interval`] reads the retired buffer in place. While it
    /// is alive, further extractions on this store wait; observations do not.
    ///
    /// The extraction lock is not reentrant: calling this again on the same
    /// thread while an `Interval` from this store is still alive deadlocks.
    /// Drop the interval (or take a [`to_snapshot`](Interval::to_snapshot))
    /// before extracting again.
    pub fn extract_and_reset(&self) -> Interval<'_> {
        let guard = self.extraction.lock();

        let retired = {
            let mut primary = self.primary.write();
            let retired = *primary;
            *primary = retired ^ 1;
            self.buffers[*primary].reset();
            retired
        };

        Interval {
            buffer: &self.buffers[retired],
            _guard: guard,
        }
    }
}

/// A finished interval, borrowed from its store without copying.
///
/// Consumers must check [`count`](Interval::count) before trusting the
/// extremes or samples: an empty interval reports `min == MIN_SENTINEL`,
/// `max == 0` and no samples.
pub struct Interval<'a> {
    buffer: &'a AggregateBuffer,
    _guard: MutexGuard<'a, ()>,
}

impl Interval<'_> {
    pub fn count(&self) -> u64 {
        self.buffer.count.load(Ordering::Relaxed)
    }

    pub fn kept(&self) -> u64 {
        self.buffer.kept.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.buffer.total.load(Ordering::Relaxed)
    }

    pub fn min(&self) -> u64 {
        self.buffer.min.load()
    }

    pub fn max(&self) -> u64 {
        self.buffer.max.load()
    }

    /// Retained samples in retention order, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u64> + '_ {
        let kept = self.kept();
        let oldest = kept.saturating_sub(SAMPLE_CAPACITY as u64);
        (oldest..kept).map(move |i| {
            self.buffer.samples[(i & SAMPLE_MASK) as usize].load(Ordering::Relaxed)
        })
    }

    /// Copy the interval out into an owned snapshot.
    pub fn to_snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            count: self.count(),
            kept: self.kept(),
            total: self.total(),
            min: self.min(),
            max: self.max(),
            samples: self.samples().collect(),
        }
    }
}

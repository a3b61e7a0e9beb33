//! Exponential bucket histogram keyed by leading-zero count.
//!
//! Bucket `b` holds values in `[2^(63-b), 2^(64-b))` for `b < 64`; bucket 64
//! holds zeros. The whole `u64` domain fits in 65 fixed counters, so the
//! histogram never allocates after construction and never needs a scale.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of buckets: one per possible leading-zero count of a `u64`.
pub const BUCKET_COUNT: usize = 65;

/// Bucket index for `value`.
#[inline]
pub fn bucket_index(value: u64) -> usize {
    value.leading_zeros() as usize
}

/// Half-open `[lower, upper)` range covered by a bucket.
///
/// `upper` is `None` for bucket 0, whose range extends past `u64::MAX`.
pub fn bucket_bounds(index: usize) -> (u64, Option<u64>) {
    match index {
        0 => (1 << 63, None),
        64 => (0, Some(1)),
        b if b < BUCKET_COUNT => (1 << (63 - b), Some(1 << (64 - b))),
        _ => (0, Some(0)),
    }
}

/// Lifetime counters for one histogram. Never reset.
///
/// Reads are independent per bucket: `read_all` may see bucket `i` before
/// and bucket `j` after a concurrent `record`, so the counts are not a
/// single point-in-time picture and need not sum to any aggregate `count`.
pub struct BucketHistogram {
    buckets: [AtomicU64; BUCKET_COUNT],
}

impl Default for BucketHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketHistogram {
    #[allow(clippy::declare_interior_mutable_const)]
    pub fn new() -> Self {
        const ZERO: AtomicU64 = AtomicU64::new(0);
        Self {
            buckets: [ZERO; BUCKET_COUNT],
        }
    }

    /// Increment the bucket `value` falls into.
    #[inline]
    pub fn record(&self, value: u64) {
        self.buckets[bucket_index(value)].fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of all counters, without resetting them.
    pub fn read_all(&self) -> [u64; BUCKET_COUNT] {
        let mut out = [0u64; BUCKET_COUNT];
        for (slot, bucket) in out.iter_mut().zip(self.buckets.iter()) {
            *slot = bucket.load(Ordering::Relaxed);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_extremes() {
        assert_eq!(bucket_index(0), 64);
        assert_eq!(bucket_index(1), 63);
        assert_eq!(bucket_index(1 << 63), 0);
        assert_eq!(bucket_index(u64::MAX), 0);
    }

    #[test]
    fn test_bucket_bounds_match_index() {
        for b in 1..64 {
            let (lower, upper) = bucket_bounds(b);
            let upper = upper.unwrap();
            assert_eq!(bucket_index(lower), b);
            assert_eq!(bucket_index(upper - 1), b);
            assert_eq!(bucket_index(upper), b - 1);
        }
        assert_eq!(bucket_bounds(0), (1 << 63, None));
        assert_eq!(bucket_bounds(64), (0, Some(1)));
    }

    #[test]
    fn test_record_increments_single_bucket() {
        let h = BucketHistogram::new();
        h.record(1000); // 1000 < 1024 -> 54 leading zeros
        h.record(0);
        h.record(1000);

        let counts = h.read_all();
        assert_eq!(counts[54], 2);
        assert_eq!(counts[64], 1);
        assert_eq!(counts.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_read_all_does_not_reset() {
        let h = BucketHistogram::new();
        h.record(5);
        assert_eq!(h.read_all()[61], 1);
        assert_eq!(h.read_all()[61], 1);
    }
}

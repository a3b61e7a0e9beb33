//! Fixed-capacity table of named histograms.
//!
//! Registration hands out dense `u32` handles from an atomic counter and
//! fills the matching slot exactly once. After that the slot is read-only
//! from the hot path: `observe` is an indexed load plus the store's shared
//! lock, with no map lookup and no allocation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::buckets::BucketHistogram;
use super::export::{AggregateSnapshot, BucketSnapshot, HistogramInfo, Scrape};
use super::store::HistogramStore;
use super::timer::HistogramTimer;
use crate::error::RegistryError;

/// Default number of histogram slots.
pub const MAX_HISTOGRAMS: usize = 1024;

/// Stable identifier of a registered histogram.
///
/// Only [`HistogramRegistry::register`] creates handles. A handle is only
/// meaningful for the registry that issued it; using it with another
/// registry is a caller bug (caught by a debug assertion, ignored in
/// release builds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    /// Dense, 0-based registration index.
    pub fn index(self) -> u32 {
        self.0
    }
}

struct Entry {
    name: String,
    store: HistogramStore,
    buckets: BucketHistogram,
}

/// Process-wide histogram table.
///
/// Build one at startup, register every histogram, then share it (usually
/// as [`SharedHistogramRegistry`]) with every call site.
///
/// Names need not be unique. Exports are keyed by name, so when two
/// histograms share a name the later registration overwrites the earlier
/// one in the exported maps, and [`handle_of`](Self::handle_of) resolves to
/// the later one.
pub struct HistogramRegistry {
    slots: Box<[OnceLock<Entry>]>,
    registered: AtomicU32,
    by_name: Mutex<HashMap<String, Handle>>,
}

impl Default for HistogramRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramRegistry {
    /// Registry with [`MAX_HISTOGRAMS`] slots.
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTOGRAMS)
    }

    /// Registry with `capacity` slots. Slot storage is allocated lazily at
    /// registration, so unused capacity costs one empty cell per slot.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            registered: AtomicU32::new(0),
            by_name: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of handles handed out so far.
    pub fn len(&self) -> usize {
        self.registered.load(Ordering::Acquire) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a histogram and return its handle.
    ///
    /// With `sampled` set, only every 4th observation is kept in the raw
    /// sample window; count, total, min and max still see every value.
    ///
    /// Meant for startup, not the hot path. Fails once every slot is taken.
    pub fn register(&self, name: &str, sampled: bool) -> Result<Handle, RegistryError> {
        let capacity = self.capacity();
        let index = self
            .registered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                ((n as usize) < capacity).then_some(n + 1)
            })
            .map_err(|_| RegistryError::CapacityExceeded { capacity })?;

        let entry = Entry {
            name: name.to_owned(),
            store: HistogramStore::new(sampled),
            buckets: BucketHistogram::new(),
        };
        if self.slots[index as usize].set(entry).is_err() {
            unreachable!("histogram handle {index} issued twice");
        }

        let handle = Handle(index);
        if let Some(previous) = self.by_name.lock().insert(name.to_owned(), handle) {
            warn!(
                name,
                previous = previous.index(),
                handle = index,
                "duplicate histogram name, exports keep the later registration"
            );
        }

        info!(name, handle = index, sampled, "registered histogram");
        Ok(handle)
    }

    /// Look up the latest handle registered under `name`.
    pub fn handle_of(&self, name: &str) -> Option<Handle> {
        self.by_name.lock().get(name).copied()
    }

    /// Record one observation.
    ///
    /// Never fails and never allocates. Waits only while a scrape is
    /// flipping this histogram's buffers.
    #[inline]
    pub fn observe(&self, handle: Handle, value: u64) {
        match self.entry(handle) {
            Some(entry) => {
                entry.store.observe(value);
                entry.buckets.record(value);
            }
            None => debug_assert!(false, "observe on unregistered handle {}", handle.0),
        }
    }

    /// Record a duration in nanoseconds, saturating at `u64::MAX`.
    #[inline]
    pub fn observe_duration(&self, handle: Handle, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.observe(handle, nanos);
    }

    /// Start a guard that records its lifetime (ns) into `handle` on drop.
    pub fn start_timer(&self, handle: Handle) -> HistogramTimer<'_> {
        HistogramTimer::new(self, handle, Instant::now())
    }

    /// Registration records, in registration order.
    pub fn histograms(&self) -> Vec<HistogramInfo> {
        self.entries()
            .map(|(index, entry)| HistogramInfo {
                handle: index,
                name: entry.name.clone(),
                sampled: entry.store.sampled(),
            })
            .collect()
    }

    /// Retire the current interval of every histogram and return it by name.
    ///
    /// Each histogram is extracted independently; the snapshots are not from
    /// one instant across histograms.
    pub fn export_aggregates(&self) -> HashMap<String, AggregateSnapshot> {
        let start = Instant::now();
        let mut out = HashMap::with_capacity(self.len());

        for (_, entry) in self.entries() {
            let snapshot = entry.store.extract_and_reset().to_snapshot();
            out.insert(entry.name.clone(), snapshot);
        }

        debug!(
            histograms = out.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "exported aggregates"
        );
        out
    }

    /// Lifetime bucket counts of every histogram, by name. Resets nothing.
    pub fn export_bucket_histograms(&self) -> HashMap<String, BucketSnapshot> {
        self.entries()
            .map(|(_, entry)| {
                (entry.name.clone(), BucketSnapshot::new(entry.buckets.read_all()))
            })
            .collect()
    }

    /// Both exports plus a timestamp.
    pub fn scrape(&self) -> Scrape {
        let scraped_at = Utc::now();
        let aggregates = self.export_aggregates();
        let buckets = self.export_bucket_histograms();
        Scrape {
            scraped_at,
            aggregates,
            buckets,
        }
    }

    #[inline]
    fn entry(&self, handle: Handle) -> Option<&Entry> {
        self.slots.get(handle.0 as usize).and_then(OnceLock::get)
    }

    /// Registered entries in handle order. Slots whose registration is still
    /// in flight on another thread are skipped.
    fn entries(&self) -> impl Iterator<Item = (u32, &Entry)> + '_ {
        self.slots[..self.len()]
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.get().map(|entry| (index as u32, entry)))
    }
}

/// Shared histogram registry handle.
pub type SharedHistogramRegistry = Arc<HistogramRegistry>;

/// Create a new shared registry with the default capacity.
pub fn new_shared_registry() -> SharedHistogramRegistry {
    Arc::new(HistogramRegistry::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::store::MIN_SENTINEL;

    #[test]
    fn test_handles_are_dense_from_zero() {
        let registry = HistogramRegistry::with_capacity(8);
        let a = registry.register("a", false).unwrap();
        let b = registry.register("b", true).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_capacity_exceeded() {
        let registry = HistogramRegistry::with_capacity(2);
        registry.register("a", false).unwrap();
        registry.register("b", false).unwrap();

        let err = registry.register("c", false).unwrap_err();
        assert_eq!(err, RegistryError::CapacityExceeded { capacity: 2 });
        // the counter does not run past capacity
        assert_eq!(registry.len(), 2);
        assert!(registry.handle_of("c").is_none());
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(HistogramRegistry::new().capacity(), MAX_HISTOGRAMS);
    }

    #[test]
    fn test_observe_feeds_store_and_buckets() {
        let registry = HistogramRegistry::with_capacity(4);
        let h = registry.register("latency", false).unwrap();
        registry.observe(h, 0);
        registry.observe(h, 1 << 63);

        let aggs = registry.export_aggregates();
        assert_eq!(aggs["latency"].count, 2);

        let buckets = registry.export_bucket_histograms();
        assert_eq!(buckets["latency"].len(), 65);
        assert_eq!(buckets["latency"][64], 1);
        assert_eq!(buckets["latency"][0], 1);
    }

    #[test]
    fn test_duplicate_names_last_registration_wins() {
        let registry = HistogramRegistry::with_capacity(4);
        let first = registry.register("dup", false).unwrap();
        let second = registry.register("dup", false).unwrap();
        registry.observe(first, 1);
        registry.observe(second, 2);
        registry.observe(second, 3);

        assert_eq!(registry.handle_of("dup"), Some(second));
        let aggs = registry.export_aggregates();
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs["dup"].count, 2);
    }

    #[test]
    fn test_export_resets_aggregates_not_buckets() {
        let registry = HistogramRegistry::with_capacity(4);
        let h = registry.register("size", false).unwrap();
        registry.observe(h, 10);

        registry.export_aggregates();
        let second = registry.export_aggregates();
        assert_eq!(second["size"].count, 0);
        assert_eq!(second["size"].min, MIN_SENTINEL);

        let buckets = registry.export_bucket_histograms();
        assert_eq!(buckets["size"].iter().sum::<u64>(), 1);
    }

    #[test]
    fn test_observe_duration_in_nanos() {
        let registry = HistogramRegistry::with_capacity(4);
        let h = registry.register("op", false).unwrap();
        registry.observe_duration(h, Duration::from_micros(3));
        registry.observe_duration(h, Duration::MAX);

        let aggs = registry.export_aggregates();
        assert_eq!(aggs["op"].min, 3_000);
        assert_eq!(aggs["op"].max, u64::MAX);
    }

    #[test]
    fn test_histograms_listing() {
        let registry = HistogramRegistry::with_capacity(4);
        registry.register("get", false).unwrap();
        registry.register("set", true).unwrap();

        let listing = registry.histograms();
        assert_eq!(
            listing,
            vec![
                HistogramInfo {
                    handle: 0,
                    name: "get".into(),
                    sampled: false,
                },
                HistogramInfo {
                    handle: 1,
                    name: "set".into(),
                    sampled: true,
                },
            ]
        );
    }
}

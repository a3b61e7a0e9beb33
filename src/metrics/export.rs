//! Owned, serializable results of a scrape.

use std::collections::HashMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::buckets::BUCKET_COUNT;
use super::store::MIN_SENTINEL;

/// One finished interval of one histogram.
///
/// Fields carry the raw buffer values: an empty interval has
/// `min == MIN_SENTINEL` and `max == 0`. Serialization writes `null` for
/// the extremes and the mean in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub count: u64,
    pub kept: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
    /// Retained raw values, oldest first, at most `SAMPLE_CAPACITY` long.
    pub samples: Vec<u64>,
}

impl AggregateSnapshot {
    pub fn empty() -> Self {
        Self {
            count: 0,
            kept: 0,
            total: 0,
            min: MIN_SENTINEL,
            max: 0,
            samples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total as f64 / self.count as f64)
    }
}

impl Serialize for AggregateSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let has_data = !self.is_empty();
        let mut s = serializer.serialize_struct("AggregateSnapshot", 7)?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("kept", &self.kept)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("min", &has_data.then_some(self.min))?;
        s.serialize_field("max", &has_data.then_some(self.max))?;
        s.serialize_field("mean", &self.mean())?;
        s.serialize_field("samples", &self.samples)?;
        s.end()
    }
}

/// Lifetime bucket counts of one histogram, index = leading zeros.
///
/// Serializes as a plain `BUCKET_COUNT`-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSnapshot([u64; BUCKET_COUNT]);

impl BucketSnapshot {
    pub fn new(counts: [u64; BUCKET_COUNT]) -> Self {
        Self(counts)
    }

    /// Sum over all buckets. Not guaranteed to match any interval `count`.
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl Deref for BucketSnapshot {
    type Target = [u64; BUCKET_COUNT];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for BucketSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Registration record of one histogram.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HistogramInfo {
    pub handle: u32,
    pub name: String,
    pub sampled: bool,
}

/// Everything one scrape pulls out of a registry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Scrape {
    pub scraped_at: DateTime<Utc>,
    pub aggregates: HashMap<String, AggregateSnapshot>,
    pub buckets: HashMap<String, BucketSnapshot>,
}

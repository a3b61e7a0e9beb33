//! High-rate histogram engine.
//!
//! Callers register histograms once at startup and keep the returned
//! [`Handle`]s. Any number of threads then `observe` values against those
//! handles, while a scraper periodically pulls each histogram's interval
//! aggregates (resetting them) and its lifetime bucket counts.
//!
//! ```ignore
//! use scrapehist::metrics::new_shared_registry;
//!
//! let registry = new_shared_registry();
//! let latency = registry.register("get_latency_ns", false)?;
//!
//! registry.observe(latency, 1_250);
//!
//! let aggregates = registry.export_aggregates(); // resets the interval
//! let buckets = registry.export_bucket_histograms(); // cumulative
//! ```

pub mod buckets;
pub mod export;
pub mod extremum;
pub mod registry;
pub mod store;
pub mod stream;
pub mod timer;

pub use buckets::{bucket_bounds, bucket_index, BucketHistogram, BUCKET_COUNT};
pub use export::{AggregateSnapshot, BucketSnapshot, HistogramInfo, Scrape};
pub use extremum::AtomicExtremum;
pub use registry::{
    new_shared_registry, Handle, HistogramRegistry, SharedHistogramRegistry, MAX_HISTOGRAMS,
};
pub use store::{HistogramStore, Interval, MIN_SENTINEL, SAMPLE_CAPACITY, SAMPLE_EVERY};
pub use timer::HistogramTimer;

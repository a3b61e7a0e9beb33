use std::time::{Duration, Instant};

use super::registry::{Handle, HistogramRegistry};

/// Records the time between its creation and drop, in nanoseconds.
///
/// ```ignore
/// let _t = registry.start_timer(get_latency);
/// backend.get(key)?;
/// // recorded here
/// ```
#[must_use = "the timer records when dropped"]
pub struct HistogramTimer<'a> {
    registry: &'a HistogramRegistry,
    handle: Handle,
    start: Instant,
}

impl<'a> HistogramTimer<'a> {
    pub(crate) fn new(registry: &'a HistogramRegistry, handle: Handle, start: Instant) -> Self {
        Self {
            registry,
            handle,
            start,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        self.registry.observe_duration(self.handle, self.start.elapsed());
    }
}

//! Lock-free running minimum / maximum over an `AtomicU64`.

use std::sync::atomic::{AtomicU64, Ordering};

/// An atomic cell that only ever moves towards one extreme.
///
/// Updates are compare-and-retry loops: load the current value, give up as
/// soon as the candidate cannot improve it, otherwise try a single CAS and
/// loop only when another thread changed the value underneath us.
#[derive(Debug)]
pub struct AtomicExtremum {
    value: AtomicU64,
}

impl AtomicExtremum {
    pub const fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    /// Raise the stored value to `candidate` if it is larger.
    #[inline]
    pub fn update_max(&self, candidate: u64) {
        self.update(candidate, |candidate, current| candidate > current);
    }

    /// Lower the stored value to `candidate` if it is smaller.
    #[inline]
    pub fn update_min(&self, candidate: u64) {
        self.update(candidate, |candidate, current| candidate < current);
    }

    #[inline]
    fn update(&self, candidate: u64, improves: impl Fn(u64, u64) -> bool) {
        let mut current = self.value.load(Ordering::Relaxed);
        while improves(candidate, current) {
            match self.value.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    pub fn load(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }
}

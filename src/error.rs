use thiserror::Error;

/// Failures surfaced by the histogram registry.
///
/// Only registration can fail. Observation and export are total.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Every slot is taken. This is a startup misconfiguration; callers
    /// should abort initialization rather than run without the histogram.
    #[error("histogram capacity exhausted: all {capacity} slots are registered")]
    CapacityExceeded { capacity: usize },
}

//! Last-props-wins request tracking.
//!
//! A caller that re-fetches on changed props must ignore a stale
//! response that resolves after a newer request has been issued. In
//! place of comparing response props against current props, a
//! monotonically increasing generation counter is issued per request
//! and a result is applied only when its generation is still the
//! latest.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation counter for one logical fetch slot.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, invalidating all earlier generations.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `generation` is still the latest issued.
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Keeps `value` only when its generation is still current.
    pub fn apply<T>(&self, generation: u64, value: T) -> Option<T> {
        if self.is_current(generation) {
            Some(value)
        } else {
            None
        }
    }
}

//! Clock sources for callers that do not track time themselves.
//!
//! Store operations take `now` explicitly; a [`Clock`] is how a caller
//! produces it.

use std::sync::atomic::{AtomicU64, Ordering};

use cadence_core::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Settable clock for deterministic replay and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`, saturating at the end of the clock.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let next = self.now().saturating_add(secs);
        self.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

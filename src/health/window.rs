//! Per-endpoint outcome counters for one accounting interval.
//!
//! Both counters share a single `AtomicU64`: the upper half holds `total`,
//! the lower half holds `failed`. Recording an outcome is one `fetch_add`,
//! and a reader always sees a matching pair, so `failed <= total` holds for
//! every observed value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

const FAILED_BITS: u32 = 32;
const FAILED_MASK: u64 = (1 << FAILED_BITS) - 1;
const ONE_REQUEST: u64 = 1 << FAILED_BITS;
const ONE_FAILURE: u64 = ONE_REQUEST | 1;

/// A consistent reading of a window's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub total: u64,
    pub failed: u64,
}

impl WindowCounts {
    fn unpack(word: u64) -> Self {
        Self {
            total: word >> FAILED_BITS,
            failed: word & FAILED_MASK,
        }
    }

    fn pack(self) -> u64 {
        (self.total << FAILED_BITS) | (self.failed & FAILED_MASK)
    }

    /// True if no outcome has been recorded.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Tumbling window of outcome counts for a single endpoint.
#[derive(Debug)]
pub struct StatsWindow {
    counts: AtomicU64,
    started_at: Mutex<Instant>,
}

impl StatsWindow {
    pub fn new(started_at: Instant) -> Self {
        Self {
            counts: AtomicU64::new(0),
            started_at: Mutex::new(started_at),
        }
    }

    /// Count one completed round trip.
    pub fn record(&self, success: bool) {
        let delta = if success { ONE_REQUEST } else { ONE_FAILURE };
        self.counts.fetch_add(delta, Ordering::AcqRel);
    }

    /// Read both counters at once.
    pub fn counts(&self) -> WindowCounts {
        WindowCounts::unpack(self.counts.load(Ordering::Acquire))
    }

    /// When the current interval began.
    pub fn started_at(&self) -> Instant {
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove `observed` from the window and start a new interval.
    ///
    /// `observed` must be a value previously returned by [`counts`](Self::counts).
    /// Outcomes recorded after that reading remain in the window.
    pub fn drain(&self, observed: WindowCounts, now: Instant) {
        self.counts.fetch_sub(observed.pack(), Ordering::AcqRel);
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

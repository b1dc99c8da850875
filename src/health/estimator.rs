//! Drop-probability estimation.
//!
//! Clamped-linear policy: below `min_requests` samples an endpoint is assumed
//! healthy; otherwise its failure rate is used directly, capped at the
//! configured ceiling.

use crate::health::window::WindowCounts;

/// Map one window's counters to a drop probability.
pub fn estimate(total: u64, failed: u64, min_requests: u64, max_drop_probability: f64) -> f64 {
    if total == 0 || total < min_requests {
        return 0.0;
    }

    let failure_rate = failed.min(total) as f64 / total as f64;
    failure_rate.min(max_drop_probability)
}

/// Convenience wrapper over [`estimate`] for a window reading.
pub fn estimate_window(counts: WindowCounts, min_requests: u64, max_drop_probability: f64) -> f64 {
    estimate(counts.total, counts.failed, min_requests, max_drop_probability)
}

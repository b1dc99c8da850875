//! Endpoint statistics registry.
//!
//! # Responsibilities
//! - Own one [`StatsWindow`] per known endpoint
//! - Publish an immutable drop-probability [`Snapshot`] at every rollover
//! - Run the periodic rollover task until closed
//!
//! # Rollover
//! ```text
//! read every window ──▶ estimate ──▶ swap in new Snapshot ──▶ subtract what was read
//! ```
//! Readers only ever load a complete snapshot. Outcomes recorded after a
//! window was read stay in that window and are counted by the next rollover.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::health::endpoint::Endpoint;
use crate::health::estimator::estimate_window;
use crate::health::window::{StatsWindow, WindowCounts};
use crate::observability::metrics;

/// Errors raised when constructing a registry.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// Rollover interval of zero.
    #[error("Stats reset period must be greater than zero")]
    ZeroResetPeriod,

    /// Probability ceiling outside `[0, 1]` or not a number.
    #[error("Max drop probability {0} is outside [0, 1]")]
    DropProbabilityOutOfRange(f64),
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryOptions {
    /// Turns probabilistic filtering (and outcome accounting) on.
    pub enabled: bool,
    /// Length of one accounting window.
    pub stats_reset_period: Duration,
    /// Minimum outcomes in a window before its failure rate is trusted.
    pub min_requests: u64,
    /// Ceiling on any endpoint's drop probability.
    pub max_drop_probability: f64,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stats_reset_period: Duration::from_secs(60),
            min_requests: 10,
            max_drop_probability: 0.9,
        }
    }
}

impl RegistryOptions {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.stats_reset_period.is_zero() {
            return Err(RegistryError::ZeroResetPeriod);
        }
        if !(0.0..=1.0).contains(&self.max_drop_probability) {
            return Err(RegistryError::DropProbabilityOutOfRange(self.max_drop_probability));
        }
        Ok(())
    }
}

/// One endpoint's closed window as seen by a rollover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedWindow {
    pub counts: WindowCounts,
    pub drop_probability: f64,
}

/// Immutable endpoint → drop probability mapping produced by one rollover.
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    endpoints: HashMap<Endpoint, ClosedWindow>,
}

impl Snapshot {
    /// Number of rollovers that led to this snapshot (0 = none yet).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop probability of `endpoint`, `0` if it was not part of the rollover.
    pub fn get(&self, endpoint: &Endpoint) -> f64 {
        self.endpoints
            .get(endpoint)
            .map(|w| w.drop_probability)
            .unwrap_or(0.0)
    }

    /// The counts `endpoint`'s probability was computed from.
    pub fn counts(&self, endpoint: &Endpoint) -> Option<WindowCounts> {
        self.endpoints.get(endpoint).map(|w| w.counts)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Endpoint, &ClosedWindow)> {
        self.endpoints.iter()
    }
}

/// Per-endpoint passive health statistics.
///
/// Constructed explicitly and owned by whoever routes traffic; several
/// registries can live side by side.
#[derive(Debug)]
pub struct EndpointRegistry {
    options: RegistryOptions,
    windows: DashMap<Endpoint, Arc<StatsWindow>>,
    snapshot: ArcSwap<Snapshot>,
    /// Serializes rollovers; never taken on the request path.
    rollover_lock: Mutex<()>,
    closed: AtomicBool,
    stop: Arc<Notify>,
}

impl EndpointRegistry {
    /// Create a registry. The rollover task is not running until [`start`](Self::start).
    pub fn new(options: RegistryOptions) -> Result<Arc<Self>, RegistryError> {
        options.validate()?;

        Ok(Arc::new(Self {
            options,
            windows: DashMap::new(),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            rollover_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            stop: Arc::new(Notify::new()),
        }))
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// True if selections should consult drop probabilities.
    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Spawn the periodic rollover task on the current tokio runtime.
    ///
    /// The task holds a weak reference only; it exits once the registry is
    /// closed or dropped. Returns `None` when passive health checks are off.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.options.enabled {
            tracing::info!("Passive health checks disabled");
            return None;
        }

        tracing::info!(
            reset_period_ms = self.options.stats_reset_period.as_millis() as u64,
            min_requests = self.options.min_requests,
            max_drop_probability = self.options.max_drop_probability,
            "Passive health check rollover starting"
        );

        let registry = Arc::downgrade(self);
        let stop = self.stop.clone();
        let period = self.options.stats_reset_period;
        Some(tokio::spawn(run_rollover(registry, stop, period)))
    }

    /// Count one completed round trip for `endpoint`.
    pub fn record_outcome(&self, endpoint: &Endpoint, success: bool) {
        if !self.options.enabled || self.is_closed() {
            return;
        }

        if let Some(window) = self.windows.get(endpoint) {
            window.record(success);
            return;
        }

        self.windows
            .entry(endpoint.clone())
            .or_insert_with(|| Arc::new(StatsWindow::new(Instant::now())))
            .record(success);
        self.discard_if_closed(endpoint);
    }

    /// Drop probability from the current snapshot; `0` for unknown endpoints.
    pub fn drop_probability(&self, endpoint: &Endpoint) -> f64 {
        self.snapshot.load().get(endpoint)
    }

    /// Start accounting for `endpoint` before it sees traffic.
    pub fn track(&self, endpoint: &Endpoint) {
        if self.is_closed() || self.windows.contains_key(endpoint) {
            return;
        }
        self.windows
            .entry(endpoint.clone())
            .or_insert_with(|| Arc::new(StatsWindow::new(Instant::now())));
        self.discard_if_closed(endpoint);
    }

    /// Undo an insert that raced with [`close`](Self::close).
    ///
    /// `close` sets the flag before clearing, so an insert landing after the
    /// clear always observes it here.
    fn discard_if_closed(&self, endpoint: &Endpoint) {
        if self.is_closed() {
            self.windows.remove(endpoint);
        }
    }

    /// Current (unpublished) counters of `endpoint`'s window.
    pub fn window(&self, endpoint: &Endpoint) -> Option<WindowCounts> {
        self.windows.get(endpoint).map(|w| w.counts())
    }

    /// Number of endpoints with a window.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Close the current window of every endpoint and publish a new snapshot.
    pub fn rollover(&self) {
        let _guard = self.rollover_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_closed() {
            return;
        }

        let now = Instant::now();
        let readings: Vec<(Endpoint, Arc<StatsWindow>, WindowCounts)> = self
            .windows
            .iter()
            .map(|entry| {
                let window = entry.value().clone();
                let counts = window.counts();
                (entry.key().clone(), window, counts)
            })
            .collect();

        let mut endpoints = HashMap::with_capacity(readings.len());
        for (endpoint, _, counts) in &readings {
            let p = estimate_window(
                *counts,
                self.options.min_requests,
                self.options.max_drop_probability,
            );
            if p > 0.0 {
                tracing::debug!(
                    endpoint = %endpoint,
                    total = counts.total,
                    failed = counts.failed,
                    drop_probability = p,
                    "Endpoint degraded"
                );
            }
            metrics::record_drop_probability(endpoint.as_str(), p);
            endpoints.insert(
                endpoint.clone(),
                ClosedWindow {
                    counts: *counts,
                    drop_probability: p,
                },
            );
        }

        let generation = self.snapshot.load().generation + 1;
        self.snapshot.store(Arc::new(Snapshot {
            generation,
            endpoints,
        }));

        for (_, window, counts) in &readings {
            window.drain(*counts, now);
        }

        metrics::record_rollover();
        tracing::trace!(generation, endpoints = readings.len(), "Stats windows rolled over");
    }

    /// Stop the rollover task and release all per-endpoint state.
    ///
    /// Outcomes reported afterwards are ignored.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop.notify_one();

        let _guard = self.rollover_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.windows.clear();
        self.snapshot.store(Arc::new(Snapshot::default()));
        tracing::debug!("Endpoint registry closed");
    }
}

impl Drop for EndpointRegistry {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_rollover(registry: Weak<EndpointRegistry>, stop: Arc<Notify>, period: Duration) {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.notified() => break,
        }

        match registry.upgrade() {
            Some(registry) if !registry.is_closed() => registry.rollover(),
            _ => break,
        }
    }

    tracing::debug!("Passive health check rollover stopped");
}

//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::health::registry::EndpointRegistry;
use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through backends. With passive health
/// checks enabled, each visited backend is skipped with its drop probability;
/// after one full turn the starting backend is used.
#[derive(Debug)]
pub struct RoundRobin {
    counter: AtomicUsize,
    registry: Arc<EndpointRegistry>,
}

impl RoundRobin {
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            registry,
        }
    }

    /// Select using the caller's random number generator.
    pub fn select_with<'a>(
        &self,
        backends: &'a [Arc<Backend>],
        rng: &mut fastrand::Rng,
    ) -> Option<&'a Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = backends.len();
        let first = &backends[start % len];
        if len == 1 || !self.registry.is_enabled() {
            return Some(first);
        }

        let snapshot = self.registry.snapshot();
        for i in 0..len {
            let backend = &backends[(start + i) % len];
            let p = snapshot.get(&backend.endpoint);
            if p <= 0.0 || rng.f64() >= p {
                return Some(backend);
            }
        }

        tracing::debug!(endpoint = %first.endpoint, "Every backend dropped, keeping turn order");
        Some(first)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        self.select_with(backends, &mut fastrand::Rng::new()).cloned()
    }
}

//! Uniform random load balancing with passive health rejection sampling.
//!
//! A candidate is drawn uniformly and kept with probability `1 - p`, where
//! `p` is its drop probability in the current health snapshot. Rejected
//! candidates are resampled up to once per candidate; when that budget runs
//! out the last draw is used regardless of its health.

use std::sync::Arc;

use crate::health::registry::EndpointRegistry;
use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Random selector.
#[derive(Debug)]
pub struct Random {
    registry: Arc<EndpointRegistry>,
}

impl Random {
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self { registry }
    }

    /// Select using the caller's random number generator.
    pub fn select_with<'a>(
        &self,
        backends: &'a [Arc<Backend>],
        rng: &mut fastrand::Rng,
    ) -> Option<&'a Arc<Backend>> {
        let len = backends.len();
        match len {
            0 => return None,
            1 => return backends.first(),
            _ => {}
        }

        if !self.registry.is_enabled() {
            return Some(&backends[rng.usize(..len)]);
        }

        let snapshot = self.registry.snapshot();
        let mut candidate = &backends[0];
        for _ in 0..len {
            candidate = &backends[rng.usize(..len)];
            let p = snapshot.get(&candidate.endpoint);
            if p <= 0.0 || rng.f64() >= p {
                return Some(candidate);
            }
            tracing::trace!(
                endpoint = %candidate.endpoint,
                drop_probability = p,
                "Candidate dropped, resampling"
            );
        }

        tracing::debug!(
            endpoint = %candidate.endpoint,
            candidates = len,
            "No candidate accepted within budget, using last draw"
        );
        Some(candidate)
    }
}

impl LoadBalancer for Random {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        self.select_with(backends, &mut fastrand::Rng::new()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::endpoint::Endpoint;
    use crate::health::registry::RegistryOptions;
    use std::collections::HashMap;
    use std::time::Duration;

    fn registry(enabled: bool) -> Arc<EndpointRegistry> {
        EndpointRegistry::new(RegistryOptions {
            enabled,
            stats_reset_period: Duration::from_millis(100),
            min_requests: 10,
            max_drop_probability: 1.0,
        })
        .unwrap()
    }

    fn backends(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| {
                Arc::new(Backend::new(
                    format!("b{}", i),
                    "web",
                    Endpoint::from(format!("127.0.0.1:{}", 8080 + i)),
                ))
            })
            .collect()
    }

    fn mark_failing(registry: &EndpointRegistry, endpoint: &Endpoint, failures: u64) {
        for _ in 0..failures {
            registry.record_outcome(endpoint, false);
        }
    }

    #[test]
    fn test_empty_candidates() {
        let lb = Random::new(registry(true));
        assert!(lb.next_server(&[]).is_none());
    }

    #[test]
    fn test_single_candidate_always_selected() {
        let registry = registry(true);
        let lb = Random::new(registry.clone());
        let backends = backends(1);

        mark_failing(&registry, &backends[0].endpoint, 100);
        registry.rollover();
        assert_eq!(registry.drop_probability(&backends[0].endpoint), 1.0);

        for _ in 0..100 {
            let s = lb.next_server(&backends).unwrap();
            assert_eq!(s.endpoint, backends[0].endpoint);
        }
    }

    #[test]
    fn test_disabled_is_uniform() {
        let registry = registry(false);
        let lb = Random::new(registry);
        let backends = backends(3);
        let mut rng = fastrand::Rng::with_seed(42);

        let mut hits: HashMap<Endpoint, usize> = HashMap::new();
        for _ in 0..3_000 {
            let s = lb.select_with(&backends, &mut rng).unwrap();
            *hits.entry(s.endpoint.clone()).or_default() += 1;
        }

        assert_eq!(hits.len(), 3);
        for count in hits.values() {
            assert!((800..=1200).contains(count), "uneven distribution: {:?}", hits);
        }
    }

    #[test]
    fn test_avoids_unhealthy_endpoint() {
        let registry = registry(true);
        let lb = Random::new(registry.clone());
        let backends = backends(3);
        let bad = backends[0].endpoint.clone();

        mark_failing(&registry, &bad, 100);
        registry.rollover();

        let mut rng = fastrand::Rng::with_seed(7);
        let bad_hits = (0..3_000)
            .filter(|_| lb.select_with(&backends, &mut rng).unwrap().endpoint == bad)
            .count();

        // Only reachable as the last draw of an exhausted budget: (1/3)^3
        assert!(bad_hits < 250, "unhealthy endpoint selected {} times", bad_hits);
    }

    #[test]
    fn test_all_unhealthy_still_serves() {
        let registry = registry(true);
        let lb = Random::new(registry.clone());
        let backends = backends(3);
        for b in &backends {
            mark_failing(&registry, &b.endpoint, 50);
        }
        registry.rollover();

        for _ in 0..100 {
            assert!(lb.next_server(&backends).is_some());
        }
    }

    #[test]
    fn test_exhausted_budget_returns_last_draw() {
        let registry = registry(true);
        let lb = Random::new(registry.clone());
        let backends = backends(3);
        for b in &backends {
            mark_failing(&registry, &b.endpoint, 50);
        }
        registry.rollover();

        for seed in 0..50 {
            // Every draw is rejected at p = 1.0, so the generator is consumed
            // as (index, coin) once per candidate.
            let mut replay = fastrand::Rng::with_seed(seed);
            let mut last = 0;
            for _ in 0..backends.len() {
                last = replay.usize(..backends.len());
                replay.f64();
            }

            let mut rng = fastrand::Rng::with_seed(seed);
            let chosen = lb.select_with(&backends, &mut rng).unwrap();
            assert_eq!(chosen.endpoint, backends[last].endpoint, "seed {}", seed);
        }
    }

    #[test]
    fn test_simulated_unhealthy_endpoint_failure_rate() {
        const REQUESTS: usize = 15_000;
        const FAILURE_PROBABILITY: f64 = 0.8;

        let registry = registry(true);
        let lb = Random::new(registry.clone());
        let backends = backends(3);
        let bad = backends[0].endpoint.clone();

        let mut select_rng = fastrand::Rng::with_seed(1);
        let mut fault_rng = fastrand::Rng::with_seed(2);
        let mut failures = 0usize;

        for i in 0..REQUESTS {
            if i > 0 && i % 500 == 0 {
                registry.rollover();
            }
            let chosen = lb.select_with(&backends, &mut select_rng).unwrap();
            let failed = chosen.endpoint == bad && fault_rng.f64() < FAILURE_PROBABILITY;
            if failed {
                failures += 1;
            }
            registry.record_outcome(&chosen.endpoint, !failed);
        }

        let expected = REQUESTS as f64 / 3.0 * FAILURE_PROBABILITY * (1.0 - FAILURE_PROBABILITY);
        let without_health_checks = REQUESTS as f64 / 3.0 * FAILURE_PROBABILITY;
        assert!(
            (failures as f64 - expected).abs() <= 0.1 * REQUESTS as f64,
            "failures {} too far from {}",
            failures,
            expected
        );
        assert!((failures as f64) < without_health_checks / 2.0);

        // First window is unfiltered; afterwards the unhealthy endpoint is
        // picked with probability a + r*a + r^2/3 for a budget of 3 draws.
        let accept = (1.0 - FAILURE_PROBABILITY) / 3.0;
        let reject = FAILURE_PROBABILITY / 3.0;
        let picked = accept + reject * accept + reject * reject / 3.0;
        let model = 500.0 * without_health_checks / REQUESTS as f64
            + (REQUESTS - 500) as f64 * picked * FAILURE_PROBABILITY;
        assert!(
            (failures as f64 - model).abs() <= 200.0,
            "failures {} too far from model {}",
            failures,
            model
        );
    }
}

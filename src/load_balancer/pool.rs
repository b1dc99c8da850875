//! Backend pool management.
//!
//! # Responsibilities
//! - Manage collections of backends grouped by name
//! - Register every configured endpoint with the health registry
//! - Apply the configured load balancing algorithm to select backends

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::health::registry::EndpointRegistry;
use crate::load_balancer::{
    backend::Backend, random::Random, round_robin::RoundRobin, Algorithm, LoadBalancer,
};

/// One named candidate set and its selector.
#[derive(Debug)]
struct BackendGroup {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

/// Manages backend pools and load balancing.
#[derive(Debug)]
pub struct BackendManager {
    groups: HashMap<String, BackendGroup>,
}

impl BackendManager {
    /// Create a new backend manager from configuration.
    pub fn new(
        configs: &[BackendConfig],
        algorithm: Algorithm,
        registry: &Arc<EndpointRegistry>,
    ) -> Self {
        let mut grouped: HashMap<String, Vec<Arc<Backend>>> = HashMap::new();

        for config in configs {
            match Backend::from_config(config) {
                Ok(backend) => {
                    registry.track(&backend.endpoint);
                    grouped
                        .entry(config.group.clone())
                        .or_default()
                        .push(Arc::new(backend));
                }
                Err(e) => tracing::warn!(backend = %config.name, error = %e, "Skipping backend"),
            }
        }

        let groups = grouped
            .into_iter()
            .map(|(name, backends)| {
                let balancer: Box<dyn LoadBalancer> = match algorithm {
                    Algorithm::Random => Box::new(Random::new(registry.clone())),
                    Algorithm::RoundRobin => Box::new(RoundRobin::new(registry.clone())),
                };
                (name, BackendGroup { backends, balancer })
            })
            .collect();

        Self { groups }
    }

    /// Select a backend for the given group.
    pub fn get(&self, group_name: &str) -> Option<Arc<Backend>> {
        let Some(group) = self.groups.get(group_name) else {
            tracing::debug!(group = %group_name, "Group not found in BackendManager");
            return None;
        };
        group.balancer.next_server(&group.backends)
    }

    /// The candidate set of a group.
    pub fn group(&self, group_name: &str) -> Option<&[Arc<Backend>]> {
        self.groups.get(group_name).map(|g| g.backends.as_slice())
    }

    /// Return a list of all backends.
    pub fn all_backends(&self) -> Vec<Arc<Backend>> {
        self.groups
            .values()
            .flat_map(|g| g.backends.iter())
            .cloned()
            .collect()
    }
}

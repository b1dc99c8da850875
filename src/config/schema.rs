//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::health::passive::FailureClassification;
use crate::health::registry::RegistryOptions;
use crate::load_balancer::Algorithm;

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping requests to backend groups.
    pub routes: Vec<RouteConfig>,

    /// Backend server definitions.
    pub backends: Vec<BackendConfig>,

    /// Selection algorithm.
    pub load_balancing: LoadBalancingConfig,

    /// Passive health check settings.
    pub passive_health_check: PassiveHealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration mapping requests to backend groups.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match; a route without one matches every path.
    pub path_prefix: Option<String>,

    /// Backend group name to forward to.
    pub backend_group: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub name: String,

    /// Backend group this server belongs to.
    pub group: String,

    /// Backend address ("127.0.0.1:3000" or "http://127.0.0.1:3000").
    pub address: String,
}

/// Load balancing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoadBalancingConfig {
    pub algorithm: Algorithm,
}

/// Passive health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PassiveHealthCheckConfig {
    /// Steer traffic away from endpoints with failing round trips.
    pub enabled: bool,

    /// Length of one statistics window in milliseconds.
    pub stats_reset_period_ms: u64,

    /// Minimum round trips in a window before its failure rate is used.
    pub min_requests: i64,

    /// Upper bound on an endpoint's drop probability.
    pub max_drop_probability: f64,

    /// Which outcomes count as failures.
    pub failure_classification: FailureClassification,
}

impl Default for PassiveHealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stats_reset_period_ms: 60_000,
            min_requests: 10,
            max_drop_probability: 0.9,
            failure_classification: FailureClassification::Transport,
        }
    }
}

impl PassiveHealthCheckConfig {
    /// Registry options for this configuration. Assumes it passed validation.
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            enabled: self.enabled,
            stats_reset_period: Duration::from_millis(self.stats_reset_period_ms),
            min_requests: self.min_requests.max(0) as u64,
            max_drop_probability: self.max_drop_probability,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream round trip timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

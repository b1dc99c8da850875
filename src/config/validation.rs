//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing backend groups)
//! - Validate value ranges (periods > 0, probabilities in [0, 1])
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::health::endpoint::Endpoint;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("backend '{name}' has invalid address '{address}'")]
    InvalidBackendAddress { name: String, address: String },

    #[error("route '{route}' references unknown backend group '{group}'")]
    UnknownBackendGroup { route: String, group: String },

    #[error("passive_health_check.min_requests must be >= 0, got {0}")]
    NegativeMinRequests(i64),

    #[error("passive_health_check.max_drop_probability must be within [0, 1], got {0}")]
    DropProbabilityOutOfRange(f64),

    #[error("passive_health_check.stats_reset_period_ms must be greater than zero")]
    ZeroResetPeriod,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }

    for backend in &config.backends {
        if Endpoint::parse(&backend.address).is_err() {
            errors.push(ValidationError::InvalidBackendAddress {
                name: backend.name.clone(),
                address: backend.address.clone(),
            });
        }
    }

    let groups: HashSet<&str> = config.backends.iter().map(|b| b.group.as_str()).collect();
    for route in &config.routes {
        if !groups.contains(route.backend_group.as_str()) {
            errors.push(ValidationError::UnknownBackendGroup {
                route: route.name.clone(),
                group: route.backend_group.clone(),
            });
        }
    }

    let phc = &config.passive_health_check;
    if phc.min_requests < 0 {
        errors.push(ValidationError::NegativeMinRequests(phc.min_requests));
    }
    if !(0.0..=1.0).contains(&phc.max_drop_probability) {
        errors.push(ValidationError::DropProbabilityOutOfRange(phc.max_drop_probability));
    }
    if phc.stats_reset_period_ms == 0 {
        errors.push(ValidationError::ZeroResetPeriod);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

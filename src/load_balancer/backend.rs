//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Carry the endpoint identity used for health accounting

use crate::config::BackendConfig;
use crate::health::endpoint::{Endpoint, InvalidEndpoint};

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Configured name, for logs.
    pub name: String,
    /// Backend group this server belongs to.
    pub group: String,
    /// The `host:port` the proxy connects to.
    pub endpoint: Endpoint,
}

impl Backend {
    /// Create a new backend.
    pub fn new(name: impl Into<String>, group: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            endpoint,
        }
    }

    /// Build a backend from its configuration entry.
    pub fn from_config(config: &BackendConfig) -> Result<Self, InvalidEndpoint> {
        let endpoint = Endpoint::parse(&config.address)?;
        Ok(Self::new(config.name.clone(), config.group.clone(), endpoint))
    }
}

//! Backend endpoint identity.

use std::borrow::Borrow;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

/// Identity of one backend instance, compared by its `host:port` string.
///
/// Cheap to clone; the address is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(Arc<str>);

/// Error returned when a configured backend address has no usable authority.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid endpoint address '{0}'")]
pub struct InvalidEndpoint(pub String);

impl Endpoint {
    /// Parse a backend address.
    ///
    /// Accepts a bare `host:port` or a URL such as `http://host:port/`; only
    /// the authority is kept. Upstreams are plain HTTP, so any other scheme
    /// is rejected.
    pub fn parse(address: &str) -> Result<Self, InvalidEndpoint> {
        let address = address.trim();
        if address.contains("://") {
            let url = Url::parse(address).map_err(|_| InvalidEndpoint(address.to_string()))?;
            if url.scheme() != "http" {
                return Err(InvalidEndpoint(address.to_string()));
            }
            let host = url
                .host_str()
                .ok_or_else(|| InvalidEndpoint(address.to_string()))?;
            let port = url
                .port_or_known_default()
                .ok_or_else(|| InvalidEndpoint(address.to_string()))?;
            return Ok(Self::from(format!("{}:{}", host, port)));
        }

        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Self::from(address))
            }
            _ => Err(InvalidEndpoint(address.to_string())),
        }
    }

    /// The `host:port` form of this endpoint.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Self(Arc::from(address))
    }
}

impl From<String> for Endpoint {
    fn from(address: String) -> Self {
        Self(Arc::from(address))
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::from(addr.to_string())
    }
}

impl Borrow<str> for Endpoint {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Endpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

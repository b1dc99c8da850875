//! Reverse proxy with passive health checking.
//!
//! Backends whose recent round trips fail are chosen less often, in
//! proportion to their failure rate over the last statistics window.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use health::{EndpointRegistry, OutcomeRecorder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Upstream transport.
//!
//! # Responsibilities
//! - Perform one backend round trip
//! - Report transport-level failures as [`TransportError`]
//!
//! # Design Decisions
//! - The proxy only depends on the [`Transport`] trait, so a wrapping
//!   transport can inject faults without touching the health core
//! - A non-2xx response is still a completed round trip

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::{BoxFuture, FutureExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// A round trip that produced no response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream request failed: {0}")]
    Other(String),
}

/// Sends a prepared request to a backend.
pub trait Transport: Send + Sync + 'static {
    fn round_trip(
        &self,
        request: Request<Body>,
    ) -> BoxFuture<'static, Result<Response<Body>, TransportError>>;
}

/// Default transport backed by hyper's pooled client.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
}

impl HyperTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
        }
    }
}

impl Transport for HyperTransport {
    fn round_trip(
        &self,
        request: Request<Body>,
    ) -> BoxFuture<'static, Result<Response<Body>, TransportError>> {
        let client = self.client.clone();
        async move {
            let response = client.request(request).await?;
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        }
        .boxed()
    }
}

//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Dispatch requests to the routing engine and load balancer
//! - Forward requests to upstream backends through a [`Transport`]
//! - Record every completed or failed round trip for passive health checks
//! - Swap in a fresh configuration generation on reload

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, uri::Scheme, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::health::{Endpoint, EndpointRegistry, Outcome, OutcomeRecorder, RegistryError};
use crate::http::client::{HyperTransport, Transport, TransportError};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::load_balancer::BackendManager;
use crate::observability::metrics;
use crate::routing::Router as ProxyRouter;

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid passive health check settings: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything derived from one configuration generation.
///
/// Each generation owns its own endpoint registry, so health statistics
/// never leak across a reload.
#[derive(Debug)]
pub struct ProxyState {
    pub config: ProxyConfig,
    pub router: ProxyRouter,
    pub backends: BackendManager,
    pub registry: Arc<EndpointRegistry>,
    pub recorder: OutcomeRecorder,
    pub request_timeout: Duration,
}

impl ProxyState {
    /// Build a generation from a configuration.
    pub fn build(config: ProxyConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let phc = &config.passive_health_check;
        let registry = EndpointRegistry::new(phc.registry_options())?;
        let recorder = OutcomeRecorder::new(registry.clone(), phc.failure_classification.classifier());
        let backends =
            BackendManager::new(&config.backends, config.load_balancing.algorithm, &registry);
        let router = ProxyRouter::from_config(&config.routes);
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);

        Ok(Self {
            config,
            router,
            backends,
            registry,
            recorder,
            request_timeout,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<ProxyState>>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// Replace the active generation, closing the previous registry.
    ///
    /// A configuration that fails to build is logged and dropped.
    pub fn apply(&self, config: ProxyConfig) {
        match ProxyState::build(config) {
            Ok(next) => {
                let next = Arc::new(next);
                next.registry.start();
                let routes = next.router.len();
                let previous = self.inner.swap(next);
                previous.registry.close();
                tracing::info!(routes, "Configuration reloaded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected configuration update, keeping current configuration");
            }
        }
    }

    /// Registry of the active generation.
    pub fn registry(&self) -> Arc<EndpointRegistry> {
        self.inner.load().registry.clone()
    }
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server using the hyper transport.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let transport = HyperTransport::new(Duration::from_secs(config.timeouts.connect_secs));
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a new HTTP server with a caller-supplied transport.
    pub fn with_transport(
        config: ProxyConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ServerError> {
        let state = ProxyState::build(config)?;
        Ok(Self {
            state: AppState {
                inner: Arc::new(ArcSwap::from_pointee(state)),
                transport,
            },
        })
    }

    /// Shared state, for inspection while the server runs.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the active
    /// generation. On exit the active registry is closed.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.state.inner.load().registry.start();

        let reload_state = self.state.clone();
        let reload = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                reload_state.apply(config);
            }
        });

        let app = Self::build_router(self.state.clone());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        reload.abort();
        self.state.inner.load().registry.close();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Looks up route, selects backend, forwards request and records the outcome.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let proxy = state.inner.load_full();
    let request_id = request.request_id().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Proxying request");

    let Some(route) = proxy.router.match_path(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request(&method, 404, "none", start_time);
        return (StatusCode::NOT_FOUND, "No matching route found").into_response();
    };

    let Some(backend) = proxy.backends.get(&route.backend_group) else {
        tracing::warn!(request_id = %request_id, group = %route.backend_group, "No backends available");
        metrics::record_request(&method, 503, "none", start_time);
        return (StatusCode::SERVICE_UNAVAILABLE, "No backends available").into_response();
    };

    let upstream = match upstream_request(request, &backend.endpoint) {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend.endpoint, error = %e, "Failed to build upstream request");
            metrics::record_request(&method, 500, backend.endpoint.as_str(), start_time);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid upstream request").into_response();
        }
    };

    let result = tokio::time::timeout(proxy.request_timeout, state.transport.round_trip(upstream))
        .await
        .unwrap_or(Err(TransportError::Timeout(proxy.request_timeout)));

    match result {
        Ok(response) => {
            let status = response.status();
            proxy.recorder.record(&backend.endpoint, &Outcome::Response(status));
            metrics::record_request(&method, status.as_u16(), backend.endpoint.as_str(), start_time);
            response
        }
        Err(e) => {
            proxy.recorder.record(&backend.endpoint, &Outcome::TransportFailure);
            tracing::warn!(request_id = %request_id, backend = %backend.endpoint, error = %e, "Upstream error");
            metrics::record_request(&method, 502, backend.endpoint.as_str(), start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Point a client request at `endpoint`, keeping path and query.
fn upstream_request(
    request: Request<Body>,
    endpoint: &Endpoint,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    parts.uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(endpoint.as_str())
        .path_and_query(path_and_query)
        .build()?;
    parts.version = Version::HTTP_11;
    parts.headers.remove(header::HOST);

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_request_rewrites_authority() {
        let request = Request::builder()
            .uri("/api/items?page=2")
            .header(header::HOST, "proxy.local")
            .body(Body::empty())
            .unwrap();

        let upstream = upstream_request(request, &Endpoint::from("10.0.0.1:8080")).unwrap();
        assert_eq!(upstream.uri().to_string(), "http://10.0.0.1:8080/api/items?page=2");
        assert!(upstream.headers().get(header::HOST).is_none());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = ProxyConfig::default();
        config.passive_health_check.max_drop_probability = 1.5;
        assert!(matches!(ProxyState::build(config), Err(ServerError::Config(_))));
    }
}

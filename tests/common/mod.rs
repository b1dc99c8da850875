//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, Router};
use futures_util::future::{BoxFuture, FutureExt};
use reverse_proxy::config::{BackendConfig, ProxyConfig, RouteConfig};
use reverse_proxy::http::{AppState, HttpServer, Transport, TransportError};
use reverse_proxy::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a mock backend on an ephemeral port that always answers `response`.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a mock backend whose status and body come from `f`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let app = Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), body)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// A config routing `/` to one group holding `backends`.
pub fn proxy_config(backends: &[SocketAddr]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    for (i, addr) in backends.iter().enumerate() {
        config.backends.push(BackendConfig {
            name: format!("b{}", i + 1),
            group: "web".into(),
            address: addr.to_string(),
        });
    }
    config.routes.push(RouteConfig {
        name: "default".into(),
        path_prefix: Some("/".into()),
        backend_group: "web".into(),
        priority: 0,
    });
    config
}

/// A proxy running in the background.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub state: AppState,
    pub config_updates: mpsc::UnboundedSender<ProxyConfig>,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<()>,
}

impl RunningProxy {
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Start `server` on an ephemeral port.
pub async fn spawn_proxy(server: HttpServer) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = server.state();
    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    RunningProxy {
        addr,
        state,
        config_updates,
        shutdown,
        handle,
    }
}

/// HTTP client that talks to the proxy directly.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Transport that fails a fraction of the round trips to one backend.
pub struct FaultyTransport {
    inner: Arc<dyn Transport>,
    target: String,
    failure_rate: f64,
    rng: std::sync::Mutex<rand::rngs::StdRng>,
}

impl FaultyTransport {
    pub fn new(inner: Arc<dyn Transport>, target: SocketAddr, failure_rate: f64, seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            inner,
            target: target.to_string(),
            failure_rate,
            rng: std::sync::Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }
}

impl Transport for FaultyTransport {
    fn round_trip(
        &self,
        request: axum::http::Request<axum::body::Body>,
    ) -> BoxFuture<'static, Result<axum::http::Response<axum::body::Body>, TransportError>> {
        use rand::Rng;

        let targeted = request
            .uri()
            .authority()
            .is_some_and(|a| a.as_str() == self.target);
        if targeted && self.rng.lock().unwrap().gen_bool(self.failure_rate) {
            return async { Err(TransportError::Other("injected failure".into())) }.boxed();
        }
        self.inner.round_trip(request)
    }
}

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, route + backend selection)
//!     → request.rs (request ID)
//!     → client.rs (upstream round trip)
//!     → server.rs (outcome recorded, response returned)
//! ```

pub mod client;
pub mod request;
pub mod server;

pub use client::{HyperTransport, Transport, TransportError};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ProxyState, ServerError};

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup)
//!     → Return: matched Route (backend group) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at config load, immutable at runtime
//! - Prefix matching only, no regex in the hot path
//! - Deterministic: highest priority, then longest prefix, then config order

pub mod router;

pub use router::{Route, Router};

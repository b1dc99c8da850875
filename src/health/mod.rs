//! Passive health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Backend round trip completes
//!     → passive.rs (classify outcome)
//!     → registry.rs (count into the endpoint's window.rs)
//!
//! Every stats reset period:
//!     registry.rs reads each window
//!     → estimator.rs (failure rate → drop probability)
//!     → publish Snapshot, reset windows
//!
//! Selection (load_balancer):
//!     candidate drawn → registry snapshot → accept or resample
//! ```
//!
//! # Design Decisions
//! - Health is a probability, never a hard exclusion
//! - Hot path is lock-free for known endpoints (sharded map + atomics)
//! - Snapshot is swapped wholesale; readers never see a partial rollover
//! - One registry per configuration generation, closed on reload

pub mod endpoint;
pub mod estimator;
pub mod passive;
pub mod registry;
pub mod window;

pub use endpoint::Endpoint;
pub use estimator::estimate;
pub use passive::{FailureClassification, Outcome, OutcomeClassifier, OutcomeRecorder};
pub use registry::{EndpointRegistry, RegistryError, RegistryOptions, Snapshot};
pub use window::{StatsWindow, WindowCounts};

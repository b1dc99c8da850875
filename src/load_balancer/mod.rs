//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → backend_group identified
//!     → pool.rs (candidate set for the group)
//!     → Apply load balancing algorithm:
//!         - random.rs (uniform draw, resample on drop)
//!         - round_robin.rs (rotate, skip on drop)
//!     → Return the selected backend
//! ```
//!
//! # Design Decisions
//! - Algorithms consult the passive health snapshot, never exclude outright
//! - A selection over a non-empty candidate set always yields a backend
//! - Algorithm selection per configuration, shared by all groups

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod pool;
pub mod random;
pub mod round_robin;

pub use backend::Backend;
pub use pool::BackendManager;
pub use random::Random;
pub use round_robin::RoundRobin;

/// A backend selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick one backend; `None` only when `backends` is empty.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Configured selection algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Random,
    RoundRobin,
}

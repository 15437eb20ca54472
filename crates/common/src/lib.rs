//! Shared configuration, error types, IDs, and observability primitives for split planner crates.
//!
//! Architecture role:
//! - defines planner/cache/pre-warm configuration passed across layers
//! - provides common [`SspError`] / [`Result`] contracts
//! - hosts prometheus metrics for pruning, pushdown and pre-warm decisions
//!
//! Key modules:
//! - [`config`]
//! - [`error`]
//! - [`ids`]
//! - [`metrics`]

pub mod config;
pub mod error;
pub mod ids;
pub mod metrics;

pub use config::{CacheConfig, CloudCredentials, PlannerConfig, PrewarmConfig};
pub use error::{Result, SspError};
pub use ids::*;
pub use metrics::{MetricsRegistry, global_metrics};

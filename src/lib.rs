//! routeward - Reward-driven visitation routing for exploring robots.
//!
//! A belief-informed route optimization library: Gaussian belief fields built
//! from other robots' reported positions and global plans, distance/reward
//! models over measured connectivity graphs, and a routing engine that treats
//! every visit as optional behind a skip penalty.

pub mod batch;
pub mod belief;
pub mod connectivity;
pub mod engine;
pub mod geometry;
pub mod routing;
pub mod snapshot;
pub mod world;

// Re-export the per-snapshot entry points for ergonomic use
pub use routing::{RouteMetrics, RouteOptimizer, SolveStatus, SolvedRoute};

/// Identifier type for robots and cells as they appear in snapshot logs.
pub type RawId = i64;

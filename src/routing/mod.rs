//! Belief-informed route optimization over one snapshot.
//!
//! [`cost_model`] derives a symmetric distance matrix and per-node rewards
//! from the connectivity graph and the belief field; [`optimizer`] drives a
//! routing engine over that model, replays recorded baseline routes, and
//! decomposes the outcome into distance/reward/penalty metrics.

pub mod cost_model;
pub mod metrics;
pub mod optimizer;

pub use cost_model::{CostModel, DEPOT_SLOT, TERMINAL_SLOT};
pub use metrics::{RouteMetrics, SolveStatus, SolvedRoute};
pub use optimizer::RouteOptimizer;

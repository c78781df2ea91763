//! Decomposed route outcome metrics.

use crate::world::NodeId;
use serde::Serialize;

/// How a [`SolvedRoute`](crate::SolvedRoute) came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// The engine found a feasible assignment.
    Solved,
    /// The engine reported no feasible assignment; the route is empty and
    /// the full reward was forfeited. A normal outcome, not an error.
    Infeasible,
    /// A recorded baseline route was replayed through the cost model.
    Replayed,
}

/// Aggregate metrics of one route, in engine cost units.
///
/// `reward_evolution` records the reward collected at each visited node in
/// visit order, so downstream analysis can see how quickly reward accrues
/// along the route. The invariant `reward + penalty == total reward on
/// offer` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteMetrics {
    pub distance: i64,
    pub reward: i64,
    pub penalty: i64,
    pub reward_evolution: Vec<i64>,
}

/// A route through the snapshot's nodes plus its decomposed metrics.
///
/// `nodes` holds domain identities in visit order, beginning with the
/// depot (the planned-for robot). An infeasible solve yields an empty
/// node list.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedRoute {
    pub status: SolveStatus,
    pub nodes: Vec<NodeId>,
    pub metrics: RouteMetrics,
}

impl SolvedRoute {
    /// The no-solution outcome: nothing visited, all reward forfeited.
    pub fn infeasible(total_reward: i64) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            nodes: Vec::new(),
            metrics: RouteMetrics {
                distance: 0,
                reward: 0,
                penalty: total_reward,
                reward_evolution: Vec::new(),
            },
        }
    }
}

//! Per-snapshot route optimization and baseline replay.
//!
//! One optimizer is scoped to exactly one snapshot: it rebuilds the belief
//! field, the connectivity graph, and the cost model from scratch, then
//! either drives a routing engine (solve mode) or walks a previously
//! recorded route through the identical cost data (replay mode), so the two
//! can be compared on equal footing.

use crate::belief::{AggregatedBeliefState, BeliefState};
use crate::connectivity::ConnectivityGraph;
use crate::engine::{
    Assignment, DescentEngine, EngineError, RoutingEngine, RoutingModel, SearchParameters,
};
use crate::geometry::Path;
use crate::routing::cost_model::{CostModel, DEPOT_SLOT, FIRST_CELL_SLOT, TERMINAL_SLOT};
use crate::routing::metrics::{RouteMetrics, SolveStatus, SolvedRoute};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::world::{Cell, NodeId, Robot};
use crate::RawId;
use log::{debug, warn};

/// Hard travel budget per route, in engine cost units.
pub const TRAVEL_BUDGET: i64 = 1000;

/// Accumulation dimension carrying raw travel distance.
pub const DISTANCE_DIMENSION: &str = "distance";

/// Accumulation dimension carrying collected reward.
pub const REWARD_DIMENSION: &str = "reward";

/// Worst-case displacement of an out-of-date robot, map units per second.
/// Scales time-since-last-update (milliseconds) into each belief's cutoff.
const DISPLACEMENT_RATE: f64 = 2.0;

/// Route planner scoped to a single snapshot.
pub struct RouteOptimizer {
    robot: Robot,
    cells: Vec<Cell>,
    graph: ConnectivityGraph,
    belief: AggregatedBeliefState,
    cost_model: CostModel,
}

impl RouteOptimizer {
    /// Builds the optimizer's world from one snapshot: reachable cells are
    /// selected up front (in candidate order), the belief field is frozen,
    /// and the cost model derived. Cells that the connectivity graph knows
    /// but the snapshot does not describe are a fatal inconsistency.
    pub fn for_snapshot(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        if snapshot.robots.is_empty() {
            return Err(SnapshotError::NoRobots);
        }
        let robot = snapshot.current_robot();
        let graph = snapshot.connectivity_graph();

        let all_cells = snapshot.cells();
        let mut cells = Vec::new();
        for node in snapshot.candidate_nodes() {
            if let NodeId::Cell(id) = node {
                if graph.is_connected(node) {
                    let cell = all_cells
                        .iter()
                        .find(|cell| cell.id == id)
                        .cloned()
                        .ok_or(SnapshotError::UnknownCell { id })?;
                    cells.push(cell);
                }
            }
        }

        let states = snapshot
            .other_robots()
            .into_iter()
            .zip(snapshot.other_robot_plans())
            .zip(&snapshot.time_since_last_update)
            .map(|((other, plan), &time_ms)| {
                BeliefState::new(other, plan, time_ms / 1000.0 * DISPLACEMENT_RATE)
            })
            .collect();
        let belief = AggregatedBeliefState::new(states);

        let cost_model = CostModel::build(&robot, &cells, &graph, &belief);
        Ok(Self {
            robot,
            cells,
            graph,
            belief,
            cost_model,
        })
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    /// The reachable cells this optimizer plans over, in slot order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn belief(&self) -> &AggregatedBeliefState {
        &self.belief
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Solves with the built-in engine.
    pub fn solve(&self) -> Result<SolvedRoute, EngineError> {
        self.solve_with(&DescentEngine)
    }

    /// Configures the routing model and lets `engine` search it. An engine
    /// that finds no feasible assignment yields the empty infeasible route,
    /// never an error.
    pub fn solve_with(&self, engine: &impl RoutingEngine) -> Result<SolvedRoute, EngineError> {
        let model = self.build_model()?;
        let parameters = SearchParameters::default();
        match engine.solve(&model, &parameters) {
            Some(assignment) => self.extract(&model, &assignment),
            None => {
                warn!(
                    "no feasible route for robot {}; forfeiting all reward",
                    self.robot.id
                );
                Ok(SolvedRoute::infeasible(self.cost_model.total_reward()))
            }
        }
    }

    fn build_model(&self) -> Result<RoutingModel, EngineError> {
        let mut model = RoutingModel::new(self.cost_model.size(), DEPOT_SLOT, TERMINAL_SLOT)?;

        let matrix = self.cost_model.matrix().to_vec();
        let transit = model.register_transit_callback(move |from, to| matrix[from][to]);
        let rewards = self.cost_model.rewards().to_vec();
        let reward = model.register_unary_callback(move |slot| rewards[slot]);

        // Raw distance is both the arc cost being minimized and the bounded
        // travel accumulator; rewards only enter through skip penalties.
        model.set_arc_cost_evaluator(transit)?;
        model.add_dimension(transit, 0, TRAVEL_BUDGET, true, DISTANCE_DIMENSION)?;
        model.add_dimension(reward, 0, self.cost_model.total_reward(), true, REWARD_DIMENSION)?;

        // Every cell may be skipped at the price of its reward
        for slot in self.cost_model.cell_slots() {
            model.add_disjunction(&[slot], self.cost_model.reward(slot))?;
        }
        Ok(model)
    }

    fn extract(
        &self,
        model: &RoutingModel,
        assignment: &Assignment,
    ) -> Result<SolvedRoute, EngineError> {
        let manager = model.index_manager();
        let distance_dimension = model.dimension(DISTANCE_DIMENSION)?;
        let reward_dimension = model.dimension(REWARD_DIMENSION)?;

        let mut nodes = Vec::new();
        let mut metrics = RouteMetrics::default();
        let mut index = assignment.start();
        while !assignment.is_end(index) {
            let slot = manager.index_to_node(index);
            if let Some(node) = self.cost_model.node_at(slot) {
                nodes.push(node);
            }
            let next = assignment.next(index);
            metrics.distance += distance_dimension.transit_value(index, next);
            if slot >= FIRST_CELL_SLOT {
                let collected = reward_dimension.transit_value(index, next);
                metrics.reward += collected;
                metrics.reward_evolution.push(collected);
            }
            index = next;
        }
        metrics.penalty = self.cost_model.total_reward() - metrics.reward;

        debug!(
            "robot {}: route of {} nodes, distance {}, reward {}, penalty {}",
            self.robot.id,
            nodes.len(),
            metrics.distance,
            metrics.reward,
            metrics.penalty
        );
        Ok(SolvedRoute {
            status: SolveStatus::Solved,
            nodes,
            metrics,
        })
    }

    /// Replays a previously recorded route through the current cost model.
    ///
    /// Recorded ids that no longer name a reachable cell are dropped with a
    /// warning; a leading entry naming the robot itself is understood as
    /// the depot, which always heads the route. An empty baseline degrades
    /// to the depot-only route with the full penalty.
    pub fn replay(&self, baseline: &[RawId]) -> SolvedRoute {
        let mut slots = vec![DEPOT_SLOT];
        for &id in baseline {
            match self.cost_model.slot_of_cell(id) {
                Some(slot) => slots.push(slot),
                None if id == self.robot.id => {}
                None => warn!("baseline node {id} is no longer reachable; skipping it"),
            }
        }

        let mut metrics = RouteMetrics::default();
        for pair in slots.windows(2) {
            metrics.distance += self.cost_model.distance(pair[0], pair[1]);
        }
        // The closing hop to the terminal is free, as in solve mode
        for &slot in &slots[1..] {
            let collected = self.cost_model.reward(slot);
            metrics.reward += collected;
            metrics.reward_evolution.push(collected);
        }
        metrics.penalty = self.cost_model.total_reward() - metrics.reward;

        let nodes = slots
            .iter()
            .filter_map(|&slot| self.cost_model.node_at(slot))
            .collect();
        SolvedRoute {
            status: SolveStatus::Replayed,
            nodes,
            metrics,
        }
    }

    /// Concatenates the recorded connection paths along a route, in visit
    /// order. Hops with no recorded geometry contribute nothing.
    pub fn route_path(&self, route: &SolvedRoute) -> Path {
        let mut path = Path::default();
        for pair in route.nodes.windows(2) {
            path.extend(&self.graph.path_between(pair[0], pair[1]));
        }
        path
    }
}

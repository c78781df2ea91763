//! Distance matrix and reward vector over one snapshot's reachable cells.

use crate::belief::LikelihoodField;
use crate::connectivity::ConnectivityGraph;
use crate::world::{Cell, NodeId, Robot};
use crate::RawId;

/// Slot of the virtual route terminal. Its matrix row and column stay zero:
/// ending the route is free from anywhere.
pub const TERMINAL_SLOT: usize = 0;

/// Slot of the depot, the planned-for robot's own position.
pub const DEPOT_SLOT: usize = 1;

/// First slot holding a reachable cell.
pub const FIRST_CELL_SLOT: usize = 2;

/// Full value of visiting a cell no other robot plausibly covers.
pub const MAX_NODE_REWARD: i64 = 1000;

/// Likelihood treated as certain coverage when scaling rewards. The
/// Gaussian kernel peaks just below this, so rewards stay positive but
/// shrink steeply inside another robot's belief field.
pub const REFERENCE_LIKELIHOOD: f64 = 0.1;

/// Converts a coverage likelihood into the integer reward of visiting.
pub fn reward_from_likelihood(likelihood: f64) -> i64 {
    let coverage = (likelihood / REFERENCE_LIKELIHOOD).min(1.0);
    (MAX_NODE_REWARD as f64 * (1.0 - coverage)).round() as i64
}

/// Symmetric distance matrix plus per-slot rewards, indexed by node slot:
/// slot 0 the terminal, slot 1 the depot, slots 2.. the reachable cells in
/// their snapshot order.
#[derive(Debug, Clone)]
pub struct CostModel {
    matrix: Vec<Vec<i64>>,
    rewards: Vec<i64>,
    robot_id: RawId,
    cell_ids: Vec<RawId>,
}

impl CostModel {
    /// Builds the matrix and rewards for `cells`, all of which must already
    /// be known reachable on `graph`.
    ///
    /// The matrix is filled lower-triangular-first from graph lookups, then
    /// mirrored, so it is symmetric by construction even though each pair is
    /// measured once.
    pub fn build(
        robot: &Robot,
        cells: &[Cell],
        graph: &ConnectivityGraph,
        field: &impl LikelihoodField,
    ) -> Self {
        let size = cells.len() + FIRST_CELL_SLOT;
        let mut matrix = vec![vec![0i64; size]; size];
        for (offset, cell) in cells.iter().enumerate() {
            let slot = offset + FIRST_CELL_SLOT;
            matrix[slot][DEPOT_SLOT] =
                graph.distance(robot.node_id(), cell.node_id()).round() as i64;
            for (other_offset, other) in cells.iter().enumerate().take(offset) {
                matrix[slot][other_offset + FIRST_CELL_SLOT] =
                    graph.distance(cell.node_id(), other.node_id()).round() as i64;
            }
        }
        for row in 0..size {
            for column in 0..row {
                matrix[column][row] = matrix[row][column];
            }
        }

        let mut rewards = vec![0i64; FIRST_CELL_SLOT];
        rewards.extend(
            cells
                .iter()
                .map(|cell| reward_from_likelihood(field.likelihood(&cell.position))),
        );

        Self {
            matrix,
            rewards,
            robot_id: robot.id,
            cell_ids: cells.iter().map(|cell| cell.id).collect(),
        }
    }

    /// Number of slots, cells plus terminal and depot.
    pub fn size(&self) -> usize {
        self.matrix.len()
    }

    pub fn matrix(&self) -> &[Vec<i64>] {
        &self.matrix
    }

    pub fn distance(&self, from_slot: usize, to_slot: usize) -> i64 {
        self.matrix[from_slot][to_slot]
    }

    pub fn rewards(&self) -> &[i64] {
        &self.rewards
    }

    pub fn reward(&self, slot: usize) -> i64 {
        self.rewards[slot]
    }

    /// Sum of every reward on offer.
    pub fn total_reward(&self) -> i64 {
        self.rewards.iter().sum()
    }

    /// Slots holding cells.
    pub fn cell_slots(&self) -> std::ops::Range<usize> {
        FIRST_CELL_SLOT..self.size()
    }

    /// Domain identity of a slot; the terminal has none.
    pub fn node_at(&self, slot: usize) -> Option<NodeId> {
        match slot {
            TERMINAL_SLOT => None,
            DEPOT_SLOT => Some(NodeId::Robot(self.robot_id)),
            _ => self
                .cell_ids
                .get(slot - FIRST_CELL_SLOT)
                .map(|&id| NodeId::Cell(id)),
        }
    }

    /// Slot of the cell with id `id`, when it is among the reachable cells.
    pub fn slot_of_cell(&self, id: RawId) -> Option<usize> {
        self.cell_ids
            .iter()
            .position(|&cell_id| cell_id == id)
            .map(|offset| offset + FIRST_CELL_SLOT)
    }

    pub fn robot_id(&self) -> RawId {
        self.robot_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{Connection, UNCONNECTED_DISTANCE};
    use crate::geometry::{Path, Position};

    struct UniformField(f64);

    impl LikelihoodField for UniformField {
        fn likelihood(&self, _position: &Position) -> f64 {
            self.0
        }
    }

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y, 0.0)
    }

    fn robot() -> Robot {
        Robot {
            position: p(0.0, 0.0),
            state_estimation: p(0.0, 0.0),
            id: 1,
        }
    }

    fn cell(id: RawId, x: f64) -> Cell {
        Cell {
            position: p(x, 0.0),
            connection_point: p(x, 0.0),
            id,
        }
    }

    fn edge(from: NodeId, to: NodeId, distance: f64) -> Connection {
        Connection {
            from,
            to,
            distance,
            path: Path::default(),
        }
    }

    fn graph_for_two_cells() -> ConnectivityGraph {
        ConnectivityGraph::from_connections([
            edge(NodeId::Robot(1), NodeId::Cell(10), 12.0),
            edge(NodeId::Robot(1), NodeId::Cell(20), 30.0),
            edge(NodeId::Cell(10), NodeId::Cell(20), 18.0),
        ])
    }

    #[test]
    fn matrix_layout_matches_slots() {
        let cells = [cell(10, 12.0), cell(20, 30.0)];
        let model = CostModel::build(&robot(), &cells, &graph_for_two_cells(), &UniformField(0.0));

        assert_eq!(model.size(), 4);
        assert_eq!(model.distance(DEPOT_SLOT, 2), 12);
        assert_eq!(model.distance(DEPOT_SLOT, 3), 30);
        assert_eq!(model.distance(2, 3), 18);
        // Terminal row and column stay zero
        for slot in 0..model.size() {
            assert_eq!(model.distance(TERMINAL_SLOT, slot), 0);
            assert_eq!(model.distance(slot, TERMINAL_SLOT), 0);
        }
    }

    #[test]
    fn matrix_is_symmetric() {
        let cells = [cell(10, 12.0), cell(20, 30.0)];
        let model = CostModel::build(&robot(), &cells, &graph_for_two_cells(), &UniformField(0.05));
        for a in 0..model.size() {
            for b in 0..model.size() {
                assert_eq!(model.distance(a, b), model.distance(b, a));
            }
        }
    }

    #[test]
    fn missing_edges_use_sentinel() {
        let graph = ConnectivityGraph::from_connections([
            edge(NodeId::Robot(1), NodeId::Cell(10), 12.0),
            edge(NodeId::Cell(10), NodeId::Cell(20), 18.0),
        ]);
        let cells = [cell(10, 12.0), cell(20, 30.0)];
        let model = CostModel::build(&robot(), &cells, &graph, &UniformField(0.0));
        assert_eq!(model.distance(DEPOT_SLOT, 3), UNCONNECTED_DISTANCE as i64);
    }

    #[test]
    fn rewards_scale_down_with_coverage() {
        assert_eq!(reward_from_likelihood(0.0), 1000);
        assert_eq!(reward_from_likelihood(0.05), 500);
        assert_eq!(reward_from_likelihood(0.1), 0);
        // Saturates rather than going negative
        assert_eq!(reward_from_likelihood(0.4), 0);
    }

    #[test]
    fn depot_and_terminal_have_zero_reward() {
        let cells = [cell(10, 12.0)];
        let graph = ConnectivityGraph::from_connections([edge(
            NodeId::Robot(1),
            NodeId::Cell(10),
            12.0,
        )]);
        let model = CostModel::build(&robot(), &cells, &graph, &UniformField(0.0));
        assert_eq!(model.reward(TERMINAL_SLOT), 0);
        assert_eq!(model.reward(DEPOT_SLOT), 0);
        assert_eq!(model.reward(2), 1000);
        assert_eq!(model.total_reward(), 1000);
    }

    #[test]
    fn slots_translate_back_to_node_ids() {
        let cells = [cell(10, 12.0), cell(20, 30.0)];
        let model = CostModel::build(&robot(), &cells, &graph_for_two_cells(), &UniformField(0.0));
        assert_eq!(model.node_at(TERMINAL_SLOT), None);
        assert_eq!(model.node_at(DEPOT_SLOT), Some(NodeId::Robot(1)));
        assert_eq!(model.node_at(2), Some(NodeId::Cell(10)));
        assert_eq!(model.node_at(3), Some(NodeId::Cell(20)));
        assert_eq!(model.slot_of_cell(20), Some(3));
        assert_eq!(model.slot_of_cell(99), None);
    }
}

//! Robots, cells, and the shared node identity they expose to the graph.

use crate::geometry::Position;
use crate::RawId;
use std::fmt::Display;

/// Identity of a node on the connectivity graph.
///
/// Robot ids and cell ids live in separate integer spaces and may collide,
/// so a bare integer is never enough to name a node. The two variants keep
/// the spaces structurally apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Robot(RawId),
    Cell(RawId),
}

impl NodeId {
    pub fn raw(&self) -> RawId {
        match self {
            NodeId::Robot(id) | NodeId::Cell(id) => *id,
        }
    }

    pub fn is_robot(&self) -> bool {
        matches!(self, NodeId::Robot(_))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Robot(id) => write!(f, "robot {id}"),
            NodeId::Cell(id) => write!(f, "cell {id}"),
        }
    }
}

/// A robot as reported in one snapshot.
///
/// `position` is the reported ground-truth location; `state_estimation` is
/// the robot's own belief about where it is, kept so estimation error can be
/// quantified downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub position: Position,
    pub state_estimation: Position,
    pub id: RawId,
}

impl Robot {
    pub fn node_id(&self) -> NodeId {
        NodeId::Robot(self.id)
    }
}

/// A visitable point of interest.
///
/// `connection_point` is where the cell attaches to the connectivity graph,
/// which may differ from the cell's own position.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub position: Position,
    pub connection_point: Position,
    pub id: RawId,
}

impl Cell {
    pub fn node_id(&self) -> NodeId {
        NodeId::Cell(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_and_cell_ids_never_compare_equal() {
        assert_ne!(NodeId::Robot(3), NodeId::Cell(3));
        assert_eq!(NodeId::Cell(3), NodeId::Cell(3));
    }

    #[test]
    fn node_id_exposes_raw_value() {
        assert_eq!(NodeId::Robot(7).raw(), 7);
        assert!(NodeId::Robot(7).is_robot());
        assert!(!NodeId::Cell(7).is_robot());
    }
}

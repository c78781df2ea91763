//! Measured point-to-point connectivity between robots and cells.
//!
//! The graph stores only what was actually measured: each edge carries the
//! driven distance and the recorded path geometry between its endpoints.
//! Queries are bidirectional, and pairs with no measured edge report a large
//! sentinel distance rather than an error, so cost models stay total.

use crate::geometry::Path;
use crate::world::NodeId;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Distance reported for node pairs with no measured connection.
///
/// Large enough that any travel budget rules the pair out, so the routing
/// layer never has to special-case unreachable arcs.
pub const UNCONNECTED_DISTANCE: f64 = 9999.0;

/// One measured connection between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
    pub distance: f64,
    pub path: Path,
}

impl Connection {
    /// True if this edge joins `a` and `b`, in either direction.
    pub fn links(&self, a: NodeId, b: NodeId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// True if either endpoint is `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

#[derive(Debug, Clone)]
struct EdgeData {
    distance: f64,
    path: Path,
}

/// Undirected view over a snapshot's measured connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    graph: UnGraph<NodeId, EdgeData>,
    node_by_id: HashMap<NodeId, NodeIndex>,
}

impl ConnectivityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_connections<I: IntoIterator<Item = Connection>>(connections: I) -> Self {
        let mut graph = Self::new();
        for connection in connections {
            graph.insert(connection);
        }
        graph
    }

    /// Adds one measured connection. When a pair was measured more than
    /// once, the first record wins.
    pub fn insert(&mut self, connection: Connection) {
        let from = self.intern(connection.from);
        let to = self.intern(connection.to);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(
                from,
                to,
                EdgeData {
                    distance: connection.distance,
                    path: connection.path,
                },
            );
        }
    }

    fn intern(&mut self, id: NodeId) -> NodeIndex {
        match self.node_by_id.get(&id) {
            Some(&index) => index,
            None => {
                let index = self.graph.add_node(id);
                self.node_by_id.insert(id, index);
                index
            }
        }
    }

    fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&EdgeData> {
        let a = *self.node_by_id.get(&a)?;
        let b = *self.node_by_id.get(&b)?;
        let edge = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(edge)
    }

    /// Measured distance between `a` and `b`, or [`UNCONNECTED_DISTANCE`]
    /// when no edge joins them.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        self.edge_between(a, b)
            .map_or(UNCONNECTED_DISTANCE, |edge| edge.distance)
    }

    /// True if `node` is an endpoint of at least one measured connection.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.node_by_id.contains_key(&node)
    }

    /// Recorded path between `a` and `b`, or an empty path when no edge
    /// joins them. The geometry is returned as recorded, regardless of the
    /// query direction.
    pub fn path_between(&self, a: NodeId, b: NodeId) -> Path {
        self.edge_between(a, b)
            .map(|edge| edge.path.clone())
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;

    fn connection(from: NodeId, to: NodeId, distance: f64) -> Connection {
        Connection {
            from,
            to,
            distance,
            path: Path::new(vec![Position::new(0.0, 0.0, 0.0)]),
        }
    }

    #[test]
    fn distance_is_bidirectional() {
        let graph =
            ConnectivityGraph::from_connections([connection(NodeId::Robot(1), NodeId::Cell(4), 12.0)]);
        assert_eq!(graph.distance(NodeId::Robot(1), NodeId::Cell(4)), 12.0);
        assert_eq!(graph.distance(NodeId::Cell(4), NodeId::Robot(1)), 12.0);
    }

    #[test]
    fn missing_edge_reports_sentinel() {
        let graph =
            ConnectivityGraph::from_connections([connection(NodeId::Cell(1), NodeId::Cell(2), 5.0)]);
        assert_eq!(
            graph.distance(NodeId::Cell(1), NodeId::Cell(3)),
            UNCONNECTED_DISTANCE
        );
    }

    #[test]
    fn id_spaces_stay_apart() {
        // Robot 2 and cell 2 share an integer id but are different nodes
        let graph =
            ConnectivityGraph::from_connections([connection(NodeId::Robot(2), NodeId::Cell(9), 3.0)]);
        assert!(graph.is_connected(NodeId::Robot(2)));
        assert!(!graph.is_connected(NodeId::Cell(2)));
        assert_eq!(
            graph.distance(NodeId::Cell(2), NodeId::Cell(9)),
            UNCONNECTED_DISTANCE
        );
    }

    #[test]
    fn first_measurement_wins_for_duplicate_pairs() {
        let graph = ConnectivityGraph::from_connections([
            connection(NodeId::Cell(1), NodeId::Cell(2), 5.0),
            connection(NodeId::Cell(2), NodeId::Cell(1), 8.0),
        ]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.distance(NodeId::Cell(1), NodeId::Cell(2)), 5.0);
    }

    #[test]
    fn path_lookup_returns_recorded_geometry_or_empty() {
        let recorded = Path::new(vec![
            Position::new(0.0, 0.0, 0.0),
            Position::new(1.0, 1.0, 0.0),
        ]);
        let graph = ConnectivityGraph::from_connections([Connection {
            from: NodeId::Robot(1),
            to: NodeId::Cell(2),
            distance: 2.0,
            path: recorded.clone(),
        }]);
        assert_eq!(graph.path_between(NodeId::Cell(2), NodeId::Robot(1)), recorded);
        assert!(graph.path_between(NodeId::Cell(2), NodeId::Cell(3)).is_empty());
    }
}

//! Snapshot log ingestion.
//!
//! Logs are plain text files of YAML records separated by `---` lines. Each
//! record captures one moment of robot/cell/connection state. Parsing is
//! strict: a record missing any consumed field is rejected for that record,
//! because the downstream cost model silently degrades if fields are
//! defaulted.

use crate::connectivity::{Connection, ConnectivityGraph};
use crate::geometry::{Path, Position};
use crate::world::{Cell, NodeId, Robot};
use crate::RawId;
use serde::Deserialize;
use thiserror::Error;

/// Line separating records in a snapshot log.
pub const RECORD_SEPARATOR: &str = "---\n";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot record: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("snapshot contains no robots")]
    NoRobots,
    #[error("expected {expected} {field} entries for other robots, found {found}")]
    OtherRobotFieldMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("candidate node arrays differ in length ({ids} ids, {flags} flags)")]
    CandidateArrayMismatch { ids: usize, flags: usize },
    #[error("cell {id} is connected but has no cell record")]
    UnknownCell { id: RawId },
}

/// Splits a log file's contents into individual YAML records.
///
/// The segment after the last separator (usually empty) is discarded.
pub fn split_records(log: &str) -> Vec<&str> {
    let mut records: Vec<&str> = log.split(RECORD_SEPARATOR).collect();
    records.pop();
    records
}

#[derive(Debug, Clone, Deserialize)]
pub struct RobotRecord {
    pub id: RawId,
    pub position: Position,
    pub state_estimation: Position,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CellRecord {
    pub id: RawId,
    pub position: Position,
    pub connection_point: Position,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathRecord {
    pub poses: Vec<PoseStamped>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoseStamped {
    pub pose: Pose,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pose {
    pub position: Position,
}

impl PathRecord {
    pub fn to_path(&self) -> Path {
        self.poses
            .iter()
            .map(|stamped| stamped.pose.position)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionRecord {
    pub from_node_id: RawId,
    pub is_from_node_robot: bool,
    pub to_node_id: RawId,
    pub is_to_node_robot: bool,
    pub distance: f64,
    pub path: PathRecord,
}

impl ConnectionRecord {
    fn endpoint(id: RawId, is_robot: bool) -> NodeId {
        if is_robot {
            NodeId::Robot(id)
        } else {
            NodeId::Cell(id)
        }
    }

    pub fn to_connection(&self) -> Connection {
        Connection {
            from: Self::endpoint(self.from_node_id, self.is_from_node_robot),
            to: Self::endpoint(self.to_node_id, self.is_to_node_robot),
            distance: self.distance,
            path: self.path.to_path(),
        }
    }
}

/// A connections-list entry: either a real record or the literal `"..."`
/// placeholder some log writers emit for elided entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConnectionEntry {
    Record(ConnectionRecord),
    Placeholder(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub route: Vec<RawId>,
}

/// One parsed snapshot record.
///
/// `robots[0]` is the robot being planned for; the remaining entries are the
/// other robots, with `other_robot_global_paths` and
/// `time_since_last_update` parallel to them. Times are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub robots: Vec<RobotRecord>,
    pub other_robot_global_paths: Vec<PathRecord>,
    pub time_since_last_update: Vec<f64>,
    pub cells: Vec<CellRecord>,
    pub cell_or_robot_ids: Vec<RawId>,
    pub is_node_robot: Vec<bool>,
    pub connections: Vec<ConnectionEntry>,
    #[serde(default)]
    pub vrp_solution: Option<Vec<RouteRecord>>,
}

impl Snapshot {
    /// Parses and validates one YAML record.
    pub fn from_yaml(record: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_yaml::from_str(record)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        if self.robots.is_empty() {
            return Err(SnapshotError::NoRobots);
        }
        let others = self.robots.len() - 1;
        if self.other_robot_global_paths.len() != others {
            return Err(SnapshotError::OtherRobotFieldMismatch {
                field: "global path",
                expected: others,
                found: self.other_robot_global_paths.len(),
            });
        }
        if self.time_since_last_update.len() != others {
            return Err(SnapshotError::OtherRobotFieldMismatch {
                field: "time-since-update",
                expected: others,
                found: self.time_since_last_update.len(),
            });
        }
        if self.cell_or_robot_ids.len() != self.is_node_robot.len() {
            return Err(SnapshotError::CandidateArrayMismatch {
                ids: self.cell_or_robot_ids.len(),
                flags: self.is_node_robot.len(),
            });
        }
        Ok(())
    }

    fn to_robot(record: &RobotRecord) -> Robot {
        Robot {
            position: record.position,
            state_estimation: record.state_estimation,
            id: record.id,
        }
    }

    /// The robot this snapshot plans for.
    ///
    /// # Panics
    ///
    /// Panics if `robots` is empty; [`Snapshot::from_yaml`] rejects such
    /// records up front.
    pub fn current_robot(&self) -> Robot {
        Self::to_robot(&self.robots[0])
    }

    pub fn other_robots(&self) -> Vec<Robot> {
        self.robots[1..].iter().map(Self::to_robot).collect()
    }

    pub fn other_robot_plans(&self) -> Vec<Path> {
        self.other_robot_global_paths
            .iter()
            .map(PathRecord::to_path)
            .collect()
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .map(|record| Cell {
                position: record.position,
                connection_point: record.connection_point,
                id: record.id,
            })
            .collect()
    }

    /// All measured connections, with placeholder entries filtered out.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .filter_map(|entry| match entry {
                ConnectionEntry::Record(record) => Some(record.to_connection()),
                ConnectionEntry::Placeholder(_) => None,
            })
            .collect()
    }

    pub fn connectivity_graph(&self) -> ConnectivityGraph {
        ConnectivityGraph::from_connections(self.connections())
    }

    /// Every candidate node named by the snapshot, robot or cell.
    pub fn candidate_nodes(&self) -> Vec<NodeId> {
        self.cell_or_robot_ids
            .iter()
            .zip(&self.is_node_robot)
            .map(|(&id, &is_robot)| {
                if is_robot {
                    NodeId::Robot(id)
                } else {
                    NodeId::Cell(id)
                }
            })
            .collect()
    }

    /// The recorded baseline route, when the snapshot carries one.
    pub fn baseline_route(&self) -> Option<&[RawId]> {
        self.vrp_solution
            .as_deref()
            .and_then(|solutions| solutions.first())
            .map(|solution| solution.route.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"
robots:
- id: 1
  position: {x: 0.0, y: 0.0, z: 0.0}
  state_estimation: {x: 0.1, y: -0.1, z: 0.0}
- id: 2
  position: {x: 10.0, y: 0.0, z: 0.0}
  state_estimation: {x: 10.0, y: 0.2, z: 0.0}
other_robot_global_paths:
- poses:
  - pose: {position: {x: 10.0, y: 0.0, z: 0.0}}
  - pose: {position: {x: 20.0, y: 0.0, z: 0.0}}
time_since_last_update: [2000.0]
cells:
- id: 4
  position: {x: 5.0, y: 5.0, z: 0.0}
  connection_point: {x: 5.0, y: 4.0, z: 0.0}
cell_or_robot_ids: [1, 4]
is_node_robot: [true, false]
connections:
- from_node_id: 1
  is_from_node_robot: true
  to_node_id: 4
  is_to_node_robot: false
  distance: 7.0
  path:
    poses:
    - pose: {position: {x: 0.0, y: 0.0, z: 0.0}}
    - pose: {position: {x: 5.0, y: 4.0, z: 0.0}}
- "..."
vrp_solution:
- route: [1, 4]
"#;

    #[test]
    fn parses_a_full_record() {
        let snapshot = Snapshot::from_yaml(RECORD).unwrap();
        assert_eq!(snapshot.current_robot().id, 1);
        assert_eq!(snapshot.other_robots().len(), 1);
        assert_eq!(snapshot.other_robot_plans()[0].len(), 2);
        assert_eq!(snapshot.cells().len(), 1);
        assert_eq!(snapshot.baseline_route(), Some(&[1, 4][..]));
    }

    #[test]
    fn placeholder_connections_are_filtered() {
        let snapshot = Snapshot::from_yaml(RECORD).unwrap();
        assert_eq!(snapshot.connections.len(), 2);
        assert_eq!(snapshot.connections().len(), 1);
    }

    #[test]
    fn candidate_nodes_carry_their_space() {
        let snapshot = Snapshot::from_yaml(RECORD).unwrap();
        assert_eq!(
            snapshot.candidate_nodes(),
            vec![NodeId::Robot(1), NodeId::Cell(4)]
        );
    }

    #[test]
    fn graph_is_built_from_filtered_connections() {
        let snapshot = Snapshot::from_yaml(RECORD).unwrap();
        let graph = snapshot.connectivity_graph();
        assert_eq!(graph.distance(NodeId::Robot(1), NodeId::Cell(4)), 7.0);
    }

    #[test]
    fn missing_field_is_fatal() {
        let truncated = RECORD.replace("time_since_last_update: [2000.0]\n", "");
        let result = Snapshot::from_yaml(&truncated);
        assert!(matches!(result, Err(SnapshotError::Yaml(_))));
    }

    #[test]
    fn mismatched_parallel_arrays_are_fatal() {
        let doubled = RECORD.replace(
            "time_since_last_update: [2000.0]",
            "time_since_last_update: [2000.0, 3000.0]",
        );
        let result = Snapshot::from_yaml(&doubled);
        assert!(matches!(
            result,
            Err(SnapshotError::OtherRobotFieldMismatch { .. })
        ));
    }

    #[test]
    fn splitter_discards_trailing_segment() {
        let log = "a: 1\n---\nb: 2\n---\n";
        assert_eq!(split_records(log), vec!["a: 1\n", "b: 2\n"]);
    }

    #[test]
    fn missing_baseline_is_none() {
        let without = RECORD.replace("vrp_solution:\n- route: [1, 4]\n", "");
        let snapshot = Snapshot::from_yaml(&without).unwrap();
        assert!(snapshot.baseline_route().is_none());
    }
}

//! Routing engine capability surface.
//!
//! The route optimizer does not search for routes itself. It configures a
//! [`RoutingModel`] (transit callbacks over node pairs, accumulated-cost
//! dimensions with capacities, and disjunctions that let nodes be skipped at
//! a penalty) and hands it to a [`RoutingEngine`]. The engine shipped with
//! this crate is [`DescentEngine`]; alternative solvers (including bindings
//! to external constraint-programming engines) can implement the same trait.
//!
//! Solutions are walked through solver-internal indices: start index, then
//! `next` until `is_end`, with dimension transit values queryable per arc.
//! [`RouteIndexManager`] translates between internal indices and node
//! numbers; only the vehicle end has a distinct internal index.

mod search;

pub use search::DescentEngine;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("node {node} is out of range for a model of {size} nodes")]
    NodeOutOfRange { node: usize, size: usize },
    #[error("transit callback {0} is not registered")]
    UnknownCallback(usize),
    #[error("dimension {0:?} is already registered")]
    DuplicateDimension(String),
    #[error("dimension {0:?} is not registered")]
    UnknownDimension(String),
}

/// Handle to a registered transit callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitCallbackId(usize);

type TransitEvaluator = Box<dyn Fn(usize, usize) -> i64 + Send + Sync>;

pub(crate) struct DimensionSpec {
    name: String,
    callback: TransitCallbackId,
    #[allow(dead_code)]
    slack_max: i64,
    capacity: i64,
    start_cumul_to_zero: bool,
}

pub(crate) struct Disjunction {
    pub(crate) nodes: Vec<usize>,
    pub(crate) penalty: i64,
}

/// Single-vehicle routing problem: a start node, an end node, registered
/// cost callbacks, bounded accumulation dimensions, and optional-visit
/// disjunctions.
pub struct RoutingModel {
    num_nodes: usize,
    start: usize,
    end: usize,
    callbacks: Vec<TransitEvaluator>,
    arc_cost_evaluator: Option<TransitCallbackId>,
    dimensions: Vec<DimensionSpec>,
    disjunctions: Vec<Disjunction>,
}

impl RoutingModel {
    pub fn new(num_nodes: usize, start: usize, end: usize) -> Result<Self, EngineError> {
        for node in [start, end] {
            if node >= num_nodes {
                return Err(EngineError::NodeOutOfRange {
                    node,
                    size: num_nodes,
                });
            }
        }
        Ok(Self {
            num_nodes,
            start,
            end,
            callbacks: Vec::new(),
            arc_cost_evaluator: None,
            dimensions: Vec::new(),
            disjunctions: Vec::new(),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Registers a pairwise transit callback and returns its handle.
    pub fn register_transit_callback(
        &mut self,
        callback: impl Fn(usize, usize) -> i64 + Send + Sync + 'static,
    ) -> TransitCallbackId {
        self.callbacks.push(Box::new(callback));
        TransitCallbackId(self.callbacks.len() - 1)
    }

    /// Registers a unary callback, evaluated on the arc's origin node.
    pub fn register_unary_callback(
        &mut self,
        callback: impl Fn(usize) -> i64 + Send + Sync + 'static,
    ) -> TransitCallbackId {
        self.register_transit_callback(move |from, _to| callback(from))
    }

    fn check_callback(&self, callback: TransitCallbackId) -> Result<(), EngineError> {
        if callback.0 >= self.callbacks.len() {
            return Err(EngineError::UnknownCallback(callback.0));
        }
        Ok(())
    }

    /// Makes `callback` the arc-cost evaluator the engine minimizes over.
    pub fn set_arc_cost_evaluator(&mut self, callback: TransitCallbackId) -> Result<(), EngineError> {
        self.check_callback(callback)?;
        self.arc_cost_evaluator = Some(callback);
        Ok(())
    }

    /// Adds an accumulation dimension over `callback`, bounded by `capacity`
    /// along the whole route.
    pub fn add_dimension(
        &mut self,
        callback: TransitCallbackId,
        slack_max: i64,
        capacity: i64,
        start_cumul_to_zero: bool,
        name: &str,
    ) -> Result<(), EngineError> {
        self.check_callback(callback)?;
        if self.dimensions.iter().any(|dim| dim.name == name) {
            return Err(EngineError::DuplicateDimension(name.to_string()));
        }
        self.dimensions.push(DimensionSpec {
            name: name.to_string(),
            callback,
            slack_max,
            capacity,
            start_cumul_to_zero,
        });
        Ok(())
    }

    /// Allows the engine to leave all of `nodes` unvisited at `penalty`,
    /// and to visit at most one of them.
    pub fn add_disjunction(&mut self, nodes: &[usize], penalty: i64) -> Result<(), EngineError> {
        for &node in nodes {
            if node >= self.num_nodes {
                return Err(EngineError::NodeOutOfRange {
                    node,
                    size: self.num_nodes,
                });
            }
        }
        self.disjunctions.push(Disjunction {
            nodes: nodes.to_vec(),
            penalty,
        });
        Ok(())
    }

    pub fn dimension(&self, name: &str) -> Result<DimensionHandle<'_>, EngineError> {
        self.dimensions
            .iter()
            .find(|dim| dim.name == name)
            .map(|spec| DimensionHandle { model: self, spec })
            .ok_or_else(|| EngineError::UnknownDimension(name.to_string()))
    }

    pub fn index_manager(&self) -> RouteIndexManager {
        RouteIndexManager {
            num_nodes: self.num_nodes,
            start: self.start,
            end: self.end,
        }
    }

    pub fn has_arc_cost_evaluator(&self) -> bool {
        self.arc_cost_evaluator.is_some()
    }

    /// The skip penalty of `node`, when some disjunction covers it.
    /// Nodes outside every disjunction must be visited.
    pub fn skip_penalty(&self, node: usize) -> Option<i64> {
        self.disjunctions
            .iter()
            .find(|disjunction| disjunction.nodes.contains(&node))
            .map(|disjunction| disjunction.penalty)
    }

    pub(crate) fn evaluate(&self, callback: TransitCallbackId, from: usize, to: usize) -> i64 {
        self.callbacks
            .get(callback.0)
            .map_or(0, |evaluator| evaluator(from, to))
    }

    /// Arc cost between two nodes under the configured evaluator.
    pub(crate) fn arc_cost(&self, from: usize, to: usize) -> i64 {
        self.arc_cost_evaluator
            .map_or(0, |callback| self.evaluate(callback, from, to))
    }

    pub(crate) fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub(crate) fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }
}

impl DimensionSpec {
    pub(crate) fn callback(&self) -> TransitCallbackId {
        self.callback
    }

    pub(crate) fn capacity(&self) -> i64 {
        self.capacity
    }

    pub(crate) fn start_cumul_to_zero(&self) -> bool {
        self.start_cumul_to_zero
    }
}

/// View over one registered dimension, for decomposing a solution into
/// per-arc accumulator contributions.
pub struct DimensionHandle<'a> {
    model: &'a RoutingModel,
    spec: &'a DimensionSpec,
}

impl DimensionHandle<'_> {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn capacity(&self) -> i64 {
        self.spec.capacity
    }

    /// Transit contribution between two solver-internal indices.
    pub fn transit_value(&self, from_index: usize, to_index: usize) -> i64 {
        let manager = self.model.index_manager();
        self.model.evaluate(
            self.spec.callback,
            manager.index_to_node(from_index),
            manager.index_to_node(to_index),
        )
    }
}

/// Translates between solver-internal indices and node numbers.
///
/// Every node's internal index equals its node number except the vehicle
/// end, which gets the one-past-the-last index so that the route walk can
/// tell "arrived back at the terminal" apart from "departing the terminal
/// node" when start and end share a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteIndexManager {
    num_nodes: usize,
    start: usize,
    end: usize,
}

impl RouteIndexManager {
    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn end_index(&self) -> usize {
        self.num_nodes
    }

    pub fn index_to_node(&self, index: usize) -> usize {
        if index >= self.num_nodes {
            self.end
        } else {
            index
        }
    }

    pub fn node_to_index(&self, node: usize) -> usize {
        if node == self.end {
            self.num_nodes
        } else {
            node
        }
    }
}

/// A solved route, walkable from `start()` via `next()` until `is_end()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    next: Vec<usize>,
    start_index: usize,
    end_index: usize,
    objective: i64,
}

impl Assignment {
    /// Builds an assignment from the visited-node sequence (starting with
    /// the vehicle start; the end node is implicit).
    pub(crate) fn from_node_route(
        route: &[usize],
        manager: &RouteIndexManager,
        objective: i64,
    ) -> Self {
        let end_index = manager.end_index();
        // Unrouted indices loop to themselves
        let mut next: Vec<usize> = (0..=end_index).collect();
        for pair in route.windows(2) {
            next[manager.node_to_index(pair[0])] = manager.node_to_index(pair[1]);
        }
        if let Some(&last) = route.last() {
            next[manager.node_to_index(last)] = end_index;
        }
        let start_index = route
            .first()
            .map_or(end_index, |&first| manager.node_to_index(first));
        Self {
            next,
            start_index,
            end_index,
            objective,
        }
    }

    pub fn start(&self) -> usize {
        self.start_index
    }

    pub fn next(&self, index: usize) -> usize {
        self.next.get(index).copied().unwrap_or(self.end_index)
    }

    pub fn is_end(&self, index: usize) -> bool {
        index == self.end_index
    }

    /// Objective value of the solution: accumulated arc cost plus the
    /// penalties of every skipped disjunction.
    pub fn objective(&self) -> i64 {
        self.objective
    }
}

/// How the initial route is grown before local search takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstSolutionStrategy {
    /// Extend along the arc whose candidate would be most expensive to
    /// reach later (largest regret), favoring constrained nodes early.
    #[default]
    MostConstrainedArc,
    /// Extend along the cheapest feasible arc from the route tail.
    PathCheapestArc,
}

/// Local search acceptance rule applied after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalSearchMetaheuristic {
    /// Accept only strictly improving moves and stop at the first local
    /// optimum. Trades solution quality for the bounded latency that
    /// per-snapshot replanning needs.
    #[default]
    GreedyDescent,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParameters {
    pub first_solution: FirstSolutionStrategy,
    pub metaheuristic: LocalSearchMetaheuristic,
}

/// A solver able to search a configured [`RoutingModel`].
///
/// Returning `None` means no feasible assignment was found, a normal
/// outcome the caller is expected to absorb rather than an error.
pub trait RoutingEngine {
    fn solve(&self, model: &RoutingModel, parameters: &SearchParameters) -> Option<Assignment>;
}

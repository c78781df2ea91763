//! Built-in route search.
//!
//! Construction grows the route one arc at a time from the vehicle start,
//! appending only nodes that keep every dimension within capacity. Local
//! search then runs greedy descent over four move kinds (drop a visited
//! optional node, insert a skipped one, relocate, 2-opt segment reversal),
//! accepting the first strictly improving feasible move and stopping at the
//! first local optimum.

use super::{
    Assignment, FirstSolutionStrategy, LocalSearchMetaheuristic, RoutingEngine, RoutingModel,
    SearchParameters,
};

/// Greedy-descent routing engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescentEngine;

impl RoutingEngine for DescentEngine {
    fn solve(&self, model: &RoutingModel, parameters: &SearchParameters) -> Option<Assignment> {
        if !model.has_arc_cost_evaluator() {
            log::debug!("routing model has no arc cost evaluator; nothing to minimize");
            return None;
        }
        let mut search = Search::new(model);
        if !search.construct(parameters.first_solution) {
            return None;
        }
        match parameters.metaheuristic {
            LocalSearchMetaheuristic::GreedyDescent => search.descend(),
        }
        Some(search.into_assignment())
    }
}

struct Search<'a> {
    model: &'a RoutingModel,
    /// Visited nodes in order; always begins with the vehicle start. The
    /// vehicle end is implicit.
    route: Vec<usize>,
    /// Optional nodes currently left out of the route.
    skipped: Vec<usize>,
}

impl<'a> Search<'a> {
    fn new(model: &'a RoutingModel) -> Self {
        Self {
            model,
            route: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Objective of a candidate route: arc costs along it (including the
    /// closing arc to the vehicle end) plus the penalty of every
    /// disjunction with no member on the route.
    fn cost_of(&self, route: &[usize]) -> i64 {
        let mut cost: i64 = route
            .windows(2)
            .map(|pair| self.model.arc_cost(pair[0], pair[1]))
            .sum();
        if let Some(&last) = route.last() {
            cost += self.model.arc_cost(last, self.model.end());
        }
        for disjunction in self.model.disjunctions() {
            if !disjunction.nodes.iter().any(|node| route.contains(node)) {
                cost += disjunction.penalty;
            }
        }
        cost
    }

    /// Whether a candidate route satisfies every dimension capacity and
    /// visits at most one member per disjunction.
    fn is_feasible(&self, route: &[usize]) -> bool {
        for disjunction in self.model.disjunctions() {
            let members_on_route = disjunction
                .nodes
                .iter()
                .filter(|node| route.contains(node))
                .count();
            if members_on_route > 1 {
                return false;
            }
        }
        for dimension in self.model.dimensions() {
            let capacity = dimension.capacity();
            let mut arcs: Vec<(usize, usize)> =
                route.windows(2).map(|pair| (pair[0], pair[1])).collect();
            if let Some(&last) = route.last() {
                arcs.push((last, self.model.end()));
            }
            let mut prefix: i64 = 0;
            let mut min_prefix: i64 = 0;
            let mut max_prefix: i64 = 0;
            for (from, to) in arcs {
                prefix += self.model.evaluate(dimension.callback(), from, to);
                min_prefix = min_prefix.min(prefix);
                max_prefix = max_prefix.max(prefix);
            }
            if dimension.start_cumul_to_zero() {
                // Cumul starts pinned at zero: every prefix must stay in range
                if min_prefix < 0 || max_prefix > capacity {
                    return false;
                }
            } else {
                // Free start cumul: some offset in [0, capacity] must keep
                // every prefix in range
                let lower = (-min_prefix).max(0);
                let upper = (capacity - max_prefix).min(capacity);
                if lower > upper {
                    return false;
                }
            }
        }
        true
    }

    /// True when every disjunction member other than `node` stays off the
    /// current route, so adding `node` cannot violate at-most-one.
    fn sibling_on_route(&self, node: usize) -> bool {
        self.model.disjunctions().iter().any(|disjunction| {
            disjunction.nodes.contains(&node)
                && disjunction
                    .nodes
                    .iter()
                    .any(|member| *member != node && self.route.contains(member))
        })
    }

    fn construct(&mut self, strategy: FirstSolutionStrategy) -> bool {
        let start = self.model.start();
        let end = self.model.end();
        self.route = vec![start];
        let mut remaining: Vec<usize> = (0..self.model.num_nodes())
            .filter(|&node| node != start && node != end)
            .collect();

        loop {
            let tail = self.route.last().copied().unwrap_or(start);
            let mut best: Option<(i64, usize)> = None;
            for (slot, &node) in remaining.iter().enumerate() {
                if self.sibling_on_route(node) {
                    continue;
                }
                let mut candidate = self.route.clone();
                candidate.push(node);
                if !self.is_feasible(&candidate) {
                    continue;
                }
                let arc = self.model.arc_cost(tail, node);
                // Both strategies minimize the key
                let key = match strategy {
                    FirstSolutionStrategy::PathCheapestArc => arc,
                    FirstSolutionStrategy::MostConstrainedArc => {
                        // Regret selection: how much cheaper it is to take
                        // this node now than from its best alternative
                        // predecessor. No alternative left means the node is
                        // maximally constrained.
                        let alternative = remaining
                            .iter()
                            .filter(|&&other| other != node)
                            .map(|&other| self.model.arc_cost(other, node))
                            .min();
                        match alternative {
                            Some(alternative) => arc.saturating_sub(alternative),
                            None => i64::MIN / 2,
                        }
                    }
                };
                if best.map_or(true, |(best_key, _)| key < best_key) {
                    best = Some((key, slot));
                }
            }
            match best {
                Some((_, slot)) => {
                    let node = remaining.swap_remove(slot);
                    self.route.push(node);
                }
                None => break,
            }
        }

        // Nodes outside every disjunction are mandatory; failing to place
        // one means the model has no feasible assignment.
        if remaining
            .iter()
            .any(|&node| self.model.skip_penalty(node).is_none())
        {
            return false;
        }
        self.skipped = remaining;
        true
    }

    fn descend(&mut self) {
        while self.try_drop() || self.try_insert() || self.try_relocate() || self.try_two_opt() {}
    }

    fn try_drop(&mut self) -> bool {
        let current = self.cost_of(&self.route);
        for position in 1..self.route.len() {
            let node = self.route[position];
            if self.model.skip_penalty(node).is_none() {
                continue;
            }
            let mut candidate = self.route.clone();
            candidate.remove(position);
            if self.is_feasible(&candidate) && self.cost_of(&candidate) < current {
                self.route = candidate;
                self.skipped.push(node);
                return true;
            }
        }
        false
    }

    fn try_insert(&mut self) -> bool {
        let current = self.cost_of(&self.route);
        for (slot, &node) in self.skipped.iter().enumerate() {
            if self.sibling_on_route(node) {
                continue;
            }
            for position in 1..=self.route.len() {
                let mut candidate = self.route.clone();
                candidate.insert(position, node);
                if self.is_feasible(&candidate) && self.cost_of(&candidate) < current {
                    self.route = candidate;
                    self.skipped.swap_remove(slot);
                    return true;
                }
            }
        }
        false
    }

    fn try_relocate(&mut self) -> bool {
        let current = self.cost_of(&self.route);
        for from in 1..self.route.len() {
            for to in 1..self.route.len() {
                if to == from {
                    continue;
                }
                let mut candidate = self.route.clone();
                let node = candidate.remove(from);
                candidate.insert(to, node);
                if candidate == self.route {
                    continue;
                }
                if self.is_feasible(&candidate) && self.cost_of(&candidate) < current {
                    self.route = candidate;
                    return true;
                }
            }
        }
        false
    }

    fn try_two_opt(&mut self) -> bool {
        let current = self.cost_of(&self.route);
        for left in 1..self.route.len() {
            for right in left + 1..self.route.len() {
                let mut candidate = self.route.clone();
                candidate[left..=right].reverse();
                if self.is_feasible(&candidate) && self.cost_of(&candidate) < current {
                    self.route = candidate;
                    return true;
                }
            }
        }
        false
    }

    fn into_assignment(self) -> Assignment {
        let objective = self.cost_of(&self.route);
        Assignment::from_node_route(&self.route, &self.model.index_manager(), objective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Model over an explicit matrix: node 0 is the terminal, node 1 the
    /// depot, higher nodes optional behind the given penalties.
    fn model_from_matrix(
        matrix: Vec<Vec<i64>>,
        capacity: i64,
        penalties: &[(usize, i64)],
    ) -> RoutingModel {
        let size = matrix.len();
        let mut model = RoutingModel::new(size, 1, 0).unwrap();
        let transit = model.register_transit_callback(move |from, to| matrix[from][to]);
        model.set_arc_cost_evaluator(transit).unwrap();
        model
            .add_dimension(transit, 0, capacity, true, "distance")
            .unwrap();
        for &(node, penalty) in penalties {
            model.add_disjunction(&[node], penalty).unwrap();
        }
        model
    }

    fn solved_nodes(model: &RoutingModel, assignment: &Assignment) -> Vec<usize> {
        let manager = model.index_manager();
        let mut nodes = Vec::new();
        let mut index = assignment.start();
        while !assignment.is_end(index) {
            nodes.push(manager.index_to_node(index));
            index = assignment.next(index);
        }
        nodes
    }

    fn solve(model: &RoutingModel) -> Assignment {
        DescentEngine
            .solve(model, &SearchParameters::default())
            .unwrap()
    }

    #[test]
    fn no_evaluator_means_no_solution() {
        let mut model = RoutingModel::new(2, 1, 0).unwrap();
        let _unused = model.register_transit_callback(|_, _| 1);
        assert!(DescentEngine
            .solve(&model, &SearchParameters::default())
            .is_none());
    }

    #[test]
    fn depot_only_route() {
        let model = model_from_matrix(vec![vec![0, 0], vec![0, 0]], 1000, &[]);
        let assignment = solve(&model);
        assert_eq!(solved_nodes(&model, &assignment), vec![1]);
        assert_eq!(assignment.objective(), 0);
    }

    #[test]
    fn visits_a_worthwhile_node() {
        // Visiting costs 50, skipping forfeits 1000
        let matrix = vec![vec![0, 0, 0], vec![0, 0, 50], vec![0, 50, 0]];
        let model = model_from_matrix(matrix, 1000, &[(2, 1000)]);
        let assignment = solve(&model);
        assert_eq!(solved_nodes(&model, &assignment), vec![1, 2]);
        assert_eq!(assignment.objective(), 50);
    }

    #[test]
    fn drops_a_node_cheaper_to_skip() {
        // Visiting costs 500, skipping only 10
        let matrix = vec![vec![0, 0, 0], vec![0, 0, 500], vec![0, 500, 0]];
        let model = model_from_matrix(matrix, 1000, &[(2, 10)]);
        let assignment = solve(&model);
        assert_eq!(solved_nodes(&model, &assignment), vec![1]);
        assert_eq!(assignment.objective(), 10);
    }

    #[test]
    fn capacity_rules_out_sentinel_arcs() {
        // The only way to node 2 costs 9999 against a budget of 1000
        let matrix = vec![vec![0, 0, 0], vec![0, 0, 9999], vec![0, 9999, 0]];
        let model = model_from_matrix(matrix, 1000, &[(2, 1000)]);
        let assignment = solve(&model);
        assert_eq!(solved_nodes(&model, &assignment), vec![1]);
        assert_eq!(assignment.objective(), 1000);
    }

    #[test]
    fn mandatory_node_beyond_capacity_is_infeasible() {
        // Node 2 has no disjunction and cannot be reached within budget
        let matrix = vec![vec![0, 0, 0], vec![0, 0, 9999], vec![0, 9999, 0]];
        let model = model_from_matrix(matrix, 1000, &[]);
        assert!(DescentEngine
            .solve(&model, &SearchParameters::default())
            .is_none());
    }

    #[test]
    fn orders_colinear_nodes_by_sweep() {
        // Depot at 0, nodes at 10/20/30 on a line; terminal is free from
        // anywhere. Optimal sweep visits them in order, total cost 30.
        let coords = [0i64, 0, 10, 20, 30];
        let size = coords.len();
        let mut matrix = vec![vec![0i64; size]; size];
        for a in 1..size {
            for b in 1..size {
                matrix[a][b] = (coords[a] - coords[b]).abs();
            }
        }
        let model = model_from_matrix(matrix, 1000, &[(2, 10_000), (3, 10_000), (4, 10_000)]);
        let assignment = solve(&model);
        assert_eq!(solved_nodes(&model, &assignment), vec![1, 2, 3, 4]);
        assert_eq!(assignment.objective(), 30);
    }

    #[test]
    fn visits_at_most_one_disjunction_member() {
        let matrix = vec![
            vec![0, 0, 0, 0],
            vec![0, 0, 5, 5],
            vec![0, 5, 0, 1],
            vec![0, 5, 1, 0],
        ];
        let size = matrix.len();
        let mut model = RoutingModel::new(size, 1, 0).unwrap();
        let transit = model.register_transit_callback(move |from, to| matrix[from][to]);
        model.set_arc_cost_evaluator(transit).unwrap();
        model
            .add_dimension(transit, 0, 1000, true, "distance")
            .unwrap();
        // One disjunction covering both nodes: visiting either clears the
        // penalty, visiting both is forbidden
        model.add_disjunction(&[2, 3], 1000).unwrap();

        let assignment = solve(&model);
        let nodes = solved_nodes(&model, &assignment);
        let visited_members = nodes.iter().filter(|&&node| node == 2 || node == 3).count();
        assert_eq!(visited_members, 1);
        assert_eq!(assignment.objective(), 5);
    }

    #[test]
    fn cheapest_arc_strategy_matches_on_simple_instances() {
        let matrix = vec![vec![0, 0, 0], vec![0, 0, 50], vec![0, 50, 0]];
        let model = model_from_matrix(matrix, 1000, &[(2, 1000)]);
        let parameters = SearchParameters {
            first_solution: FirstSolutionStrategy::PathCheapestArc,
            ..SearchParameters::default()
        };
        let assignment = DescentEngine.solve(&model, &parameters).unwrap();
        assert_eq!(solved_nodes(&model, &assignment), vec![1, 2]);
    }
}

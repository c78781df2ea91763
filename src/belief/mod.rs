//! Spatial belief fields over other robots' recent state.
//!
//! Each observed robot contributes a Gaussian likelihood of "this space is
//! already covered", centered on whichever is closer: the robot's reported
//! position or its published global plan. Beyond a per-robot displacement
//! limit the likelihood cuts off to zero so a stale observation cannot
//! claim the whole map. Robots are combined by elementwise maximum: a point
//! is covered if *any* robot plausibly covers it, and several weak beliefs
//! must not add up to near-certainty.

use crate::geometry::{Path, Position};
use crate::world::Robot;

/// Scalar coverage-likelihood field over map positions.
///
/// The seam between belief modeling and the route cost model: reward
/// construction only needs `likelihood`, so tests can substitute synthetic
/// fields.
pub trait LikelihoodField {
    /// Likelihood in `[0, K1]` that `position` is already covered.
    fn likelihood(&self, position: &Position) -> f64;
}

/// Belief about one other robot, frozen at snapshot time.
#[derive(Debug, Clone)]
pub struct BeliefState {
    robot: Robot,
    plan: Path,
    limit: f64,
}

impl BeliefState {
    /// Kernel width in map units.
    pub const SIGMA: f64 = 5.0;

    pub fn new(robot: Robot, plan: Path, limit: f64) -> Self {
        Self { robot, plan, limit }
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn plan(&self) -> &Path {
        &self.plan
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Peak of the Gaussian kernel: `1 / (σ√(2π))`.
    pub fn peak_likelihood() -> f64 {
        1.0 / (Self::SIGMA * std::f64::consts::TAU.sqrt())
    }

    fn exponent_coefficient() -> f64 {
        1.0 / (2.0 * Self::SIGMA * Self::SIGMA)
    }
}

impl LikelihoodField for BeliefState {
    fn likelihood(&self, position: &Position) -> f64 {
        let to_plan = self.plan.distance_to(position);
        let to_robot = self.robot.position.distance_to(position);
        let distance = to_plan.min(to_robot);
        if distance > self.limit {
            return 0.0;
        }
        Self::peak_likelihood() * (-Self::exponent_coefficient() * distance * distance).exp()
    }
}

/// All per-robot beliefs observed in one snapshot, combined by maximum.
#[derive(Debug, Clone, Default)]
pub struct AggregatedBeliefState {
    states: Vec<BeliefState>,
}

impl AggregatedBeliefState {
    pub fn new(states: Vec<BeliefState>) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &[BeliefState] {
        &self.states
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl LikelihoodField for AggregatedBeliefState {
    fn likelihood(&self, position: &Position) -> f64 {
        self.states
            .iter()
            .map(|state| state.likelihood(position))
            .fold(0.0, f64::max)
    }
}

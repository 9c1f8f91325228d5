//! Multi-objective environment abstraction.
//!
//! Environments are tabular: observations are small integer vectors that can
//! be used directly as Q-table keys. Rewards are vectors with one component
//! per objective.

mod deep_sea_treasure;

pub use deep_sea_treasure::DeepSeaTreasure;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete observation, usable as a hash key.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Observation(pub Vec<i64>);

impl Observation {
    /// Build an observation from its coordinates.
    pub fn new(coords: impl Into<Vec<i64>>) -> Self {
        Self(coords.into())
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Observation after the step.
    pub observation: Observation,
    /// Vector reward, one entry per objective.
    pub reward: Vec<f64>,
    /// Episode ended in a terminal state.
    pub terminated: bool,
    /// Episode ended because of a time limit.
    pub truncated: bool,
}

impl StepOutcome {
    /// Terminal OR truncated.
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// A multi-objective environment with a discrete action space.
pub trait MoEnvironment {
    /// Start a new episode and return the initial observation.
    fn reset(&mut self) -> Observation;

    /// Apply `action` (in `0..action_count()`).
    fn step(&mut self, action: usize) -> crate::Result<StepOutcome>;

    /// Number of discrete actions.
    fn action_count(&self) -> usize;

    /// Number of reward objectives (`k`).
    fn reward_dim(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_display() {
        assert_eq!(Observation::new(vec![2, 3]).to_string(), "[2, 3]");
    }

    #[test]
    fn test_step_outcome_done() {
        let step = StepOutcome {
            observation: Observation::new(vec![0]),
            reward: vec![0.0, -1.0],
            terminated: false,
            truncated: true,
        };
        assert!(step.done());
    }
}

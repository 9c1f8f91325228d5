//! Shared helpers for the ruvector-multi-policy integration tests.
//!
//! Provides a frontier service that follows a fixed script, and builders
//! for Q-learning policies with preset action values.

#![allow(dead_code)]

use rand::rngs::StdRng;
use ruvector_multi_policy::error::{MultiPolicyError, Result};
use ruvector_multi_policy::{
    FrontierService, GpiProbe, MoQLearning, MultiPolicyConfig, Observation, PolicyPool, SubPolicy,
    WeightSelection,
};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Scripted frontier
// ---------------------------------------------------------------------------

/// Frontier whose removal decisions and proposed weights are fixed up front.
///
/// `add_solution` appends the value, then applies the next scripted removal
/// list (indices that are out of range are skipped on the frontier side so
/// the pool can detect the mismatch).
#[derive(Debug, Default)]
pub struct ScriptedFrontier {
    ccs: Vec<Vec<f64>>,
    removals: VecDeque<Vec<usize>>,
    weights: VecDeque<Vec<f64>>,
}

impl ScriptedFrontier {
    /// Frontier that keeps every value.
    pub fn keep_all() -> Self {
        Self::default()
    }

    /// Frontier answering successive `add_solution` calls with `removals`.
    pub fn with_removals(removals: Vec<Vec<usize>>) -> Self {
        Self {
            removals: removals.into(),
            ..Self::default()
        }
    }

    /// Queue a removal list for the next `add_solution`.
    pub fn push_removal(&mut self, removal: Vec<usize>) {
        self.removals.push_back(removal);
    }

    /// Queue weights for `next_weight`.
    pub fn with_weights(mut self, weights: Vec<Vec<f64>>) -> Self {
        self.weights = weights.into();
        self
    }
}

impl FrontierService for ScriptedFrontier {
    fn next_weight(
        &mut self,
        _strategy: WeightSelection,
        _probe: Option<GpiProbe<'_>>,
        _eval_repetitions: usize,
        _rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        self.weights
            .pop_front()
            .ok_or_else(|| MultiPolicyError::InvalidState("weight script exhausted".into()))
    }

    fn add_solution(&mut self, value: Vec<f64>, _weight: Vec<f64>) -> Result<Vec<usize>> {
        let removal = self.removals.pop_front().unwrap_or_default();
        self.ccs.push(value);
        let mut sorted = removal.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for i in sorted {
            if i < self.ccs.len() {
                self.ccs.remove(i);
            }
        }
        Ok(removal)
    }

    fn remove_solutions(&mut self, indices: &[usize]) -> Result<()> {
        for &i in indices {
            if i >= self.ccs.len() {
                return Err(MultiPolicyError::InvariantViolation(format!(
                    "index {i} out of range"
                )));
            }
            self.ccs.remove(i);
        }
        Ok(())
    }

    fn ccs(&self) -> &[Vec<f64>] {
        &self.ccs
    }
}

// ---------------------------------------------------------------------------
// Policy builders
// ---------------------------------------------------------------------------

/// The state every preset policy knows about.
pub fn origin() -> Observation {
    Observation::new(vec![0, 0])
}

/// Q-learning policy for `weight` whose Q-table holds `rows` at [`origin`].
pub fn preset_policy(id: usize, weight: Vec<f64>, rows: Vec<Vec<f64>>) -> MoQLearning {
    let dim = weight.len();
    let mut policy = MoQLearning::new(
        id,
        weight,
        &MultiPolicyConfig::default(),
        rows.len(),
        dim,
        id as u64,
    )
    .expect("valid policy");
    *policy.q_table_mut().entry(&origin()) = rows;
    policy
}

/// Untrained two-objective policy with four actions.
pub fn blank_policy(id: usize, weight: Vec<f64>) -> MoQLearning {
    MoQLearning::new(id, weight, &MultiPolicyConfig::default(), 4, 2, id as u64)
        .expect("valid policy")
}

/// Pool of `n` committed blank policies whose frontier values encode their
/// ids as `[id, 0]`.
pub fn scripted_pool(n: usize) -> PolicyPool<MoQLearning, ScriptedFrontier> {
    let mut pool = PolicyPool::new(ScriptedFrontier::keep_all());
    for id in 0..n {
        pool.stage(blank_policy(id, vec![0.5, 0.5])).expect("stage");
        pool.commit(vec![id as f64, 0.0]).expect("commit");
    }
    pool
}

/// Ids of the committed entries, in pool order.
pub fn pool_ids<F: FrontierService>(pool: &PolicyPool<MoQLearning, F>) -> Vec<usize> {
    pool.entries().iter().map(|entry| entry.id).collect()
}

/// Ids encoded in the frontier values of a [`scripted_pool`].
pub fn frontier_ids<F: FrontierService>(pool: &PolicyPool<MoQLearning, F>) -> Vec<usize> {
    pool.ccs().iter().map(|v| v[0] as usize).collect()
}

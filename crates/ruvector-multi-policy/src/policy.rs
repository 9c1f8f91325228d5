//! Sub-policy traits and the tabular value store.
//!
//! [`ActionSelector`] is the minimal "act for a weight" capability. It is what
//! evaluation rollouts and GPI-guided linear support consume, so the
//! coordinator can hand out its own decision rule without exposing itself.
//! [`SubPolicy`] adds the training surface a pool member must provide.

use crate::env::{MoEnvironment, Observation};
use crate::error::Result;
use crate::weights::dot;
use std::collections::HashMap;
use std::time::Instant;

/// Anything that can pick an action for a state under a weight vector.
pub trait ActionSelector {
    /// Choose an action in `0..action_count` for `state`, scalarizing with
    /// `weight`.
    fn decide(&self, state: &Observation, weight: &[f64]) -> Result<usize>;
}

/// Per-state, per-action, per-objective value estimates.
///
/// Unvisited states read as all-zero. `Clone` is a deep copy: the cloned
/// table shares nothing with the original.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    action_count: usize,
    reward_dim: usize,
    entries: HashMap<Observation, Vec<Vec<f64>>>,
}

impl QTable {
    /// Empty table for the given action and objective counts.
    pub fn new(action_count: usize, reward_dim: usize) -> Self {
        Self {
            action_count,
            reward_dim,
            entries: HashMap::new(),
        }
    }

    /// Number of actions per state.
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// Number of objectives per action value.
    pub fn reward_dim(&self) -> usize {
        self.reward_dim
    }

    /// Number of visited states.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no state has been visited.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `state` has an entry.
    pub fn contains(&self, state: &Observation) -> bool {
        self.entries.contains_key(state)
    }

    /// Action-value vectors for a visited state, `[action][objective]`.
    pub fn get(&self, state: &Observation) -> Option<&[Vec<f64>]> {
        self.entries.get(state).map(|rows| rows.as_slice())
    }

    /// Value vector of one state-action pair, zeros if unvisited.
    pub fn value(&self, state: &Observation, action: usize) -> Vec<f64> {
        self.entries
            .get(state)
            .and_then(|rows| rows.get(action))
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.reward_dim])
    }

    /// Mutable rows for `state`, inserting zeros on first visit.
    pub fn entry(&mut self, state: &Observation) -> &mut Vec<Vec<f64>> {
        let (actions, dim) = (self.action_count, self.reward_dim);
        self.entries
            .entry(state.clone())
            .or_insert_with(|| vec![vec![0.0; dim]; actions])
    }

    /// `w · Q(state, a)` for every action, zeros for unvisited states.
    pub fn scalarized(&self, state: &Observation, weight: &[f64]) -> Vec<f64> {
        match self.entries.get(state) {
            Some(rows) => rows.iter().map(|q| dot(weight, q)).collect(),
            None => vec![0.0; self.action_count],
        }
    }
}

/// Step budget and bookkeeping for one call to [`SubPolicy::train`].
#[derive(Debug, Clone)]
pub struct TrainBudget {
    /// Wall-clock reference for throughput reporting.
    pub started_at: Instant,
    /// Environment steps to take in this call.
    pub total_steps: u64,
    /// Continue the step counter instead of resetting it to zero.
    pub resume: bool,
    /// Steps between greedy evaluations on the evaluation environment.
    pub eval_frequency: u64,
}

impl TrainBudget {
    /// Budget of `total_steps` that continues the existing step counter.
    pub fn resuming(total_steps: u64, eval_frequency: u64) -> Self {
        Self {
            started_at: Instant::now(),
            total_steps,
            resume: true,
            eval_frequency,
        }
    }
}

/// A trainable single-objective policy bound to one weight vector.
pub trait SubPolicy: ActionSelector {
    /// Identifier assigned at creation.
    fn id(&self) -> usize;

    /// The weight this policy optimizes. Fixed for its lifetime.
    fn weight(&self) -> &[f64];

    /// Train on `env` for `budget.total_steps` steps.
    fn train(
        &mut self,
        env: &mut dyn MoEnvironment,
        budget: &TrainBudget,
        eval_env: Option<&mut dyn MoEnvironment>,
    ) -> Result<()>;

    /// Greedy action for `state`.
    fn eval(&self, state: &Observation, weight: &[f64]) -> usize;

    /// `w · Q(state, a)` for every action.
    fn scalarized_q_values(&self, state: &Observation, weight: &[f64]) -> Vec<f64>;

    /// Learned values.
    fn q_table(&self) -> &QTable;

    /// Mutable access to the learned values.
    fn q_table_mut(&mut self) -> &mut QTable;

    /// Replace the learned values (warm start).
    fn set_q_table(&mut self, table: QTable);

    /// Total environment steps consumed.
    fn global_step(&self) -> u64;

    /// Overwrite the step counter before a resumed training call.
    fn set_global_step(&mut self, step: u64);
}

//! Scalarized multi-objective Q-learning.
//!
//! One value vector per state-action pair; a linear scalarization with the
//! policy's own weight picks the greedy action. Optional Dyna-Q replays
//! remembered transitions from a tabular model after every real step.
//!
//! Reference: K. Van Moffaert, M. Drugan, A. Nowé, "Scalarized
//! Multi-Objective Reinforcement Learning: Novel Design Techniques", 2013.

use crate::config::MultiPolicyConfig;
use crate::env::{MoEnvironment, Observation, StepOutcome};
use crate::error::{ensure_dim, Result};
use crate::evaluation::evaluate_policy;
use crate::policy::{ActionSelector, QTable, SubPolicy, TrainBudget};
use crate::weights::{argmax_first, dot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::debug;

/// Steps between throughput / TD-error trace events.
const TRACE_INTERVAL: u64 = 1000;

/// Linear schedule from `initial` to `final_value` over `decay_period`
/// steps, starting after `warmup` steps. Clamped to the endpoints.
pub fn linearly_decaying_value(
    initial: f64,
    decay_period: u64,
    step: u64,
    warmup: u64,
    final_value: f64,
) -> f64 {
    if decay_period == 0 {
        return final_value;
    }
    let steps_left = decay_period as f64 + warmup as f64 - step as f64;
    let bonus = (initial - final_value) * steps_left / decay_period as f64;
    let value = final_value + bonus;
    value.clamp(initial.min(final_value), initial.max(final_value))
}

/// A remembered transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTransition {
    /// State the action was taken in.
    pub state: Observation,
    /// Action taken.
    pub action: usize,
    /// Vector reward observed.
    pub reward: Vec<f64>,
    /// Resulting state.
    pub next_state: Observation,
    /// Whether the resulting state was terminal.
    pub terminal: bool,
}

/// Deterministic tabular model: the last outcome seen for each state-action.
#[derive(Debug, Clone, Default)]
pub struct TabularModel {
    index: HashMap<(Observation, usize), usize>,
    transitions: Vec<ModelTransition>,
}

impl TabularModel {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the outcome of `(state, action)`.
    pub fn update(&mut self, transition: ModelTransition) {
        let key = (transition.state.clone(), transition.action);
        match self.index.get(&key) {
            Some(&slot) => self.transitions[slot] = transition,
            None => {
                self.index.insert(key, self.transitions.len());
                self.transitions.push(transition);
            }
        }
    }

    /// Uniformly sample a remembered transition.
    pub fn random_transition(&self, rng: &mut impl Rng) -> Option<&ModelTransition> {
        if self.transitions.is_empty() {
            return None;
        }
        self.transitions.get(rng.gen_range(0..self.transitions.len()))
    }

    /// Number of distinct state-action pairs remembered.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Tabular scalarized MO Q-learning agent bound to one weight vector.
#[derive(Debug, Clone)]
pub struct MoQLearning {
    id: usize,
    weight: Vec<f64>,
    learning_rate: f64,
    gamma: f64,
    initial_epsilon: f64,
    final_epsilon: f64,
    epsilon_decay_steps: Option<u64>,
    learning_starts: u64,
    dyna_updates: usize,
    max_episode_steps: usize,
    /// Current exploration rate.
    pub epsilon: f64,
    q_table: QTable,
    model: Option<TabularModel>,
    global_step: u64,
    num_episodes: u64,
    rng: StdRng,
}

impl MoQLearning {
    /// Create an agent for `weight` with the shared hyper-parameters.
    pub fn new(
        id: usize,
        weight: Vec<f64>,
        config: &MultiPolicyConfig,
        action_count: usize,
        reward_dim: usize,
        seed: u64,
    ) -> Result<Self> {
        ensure_dim("policy weight", reward_dim, weight.len())?;
        Ok(Self {
            id,
            weight,
            learning_rate: config.learning_rate,
            gamma: config.gamma,
            initial_epsilon: config.initial_epsilon,
            final_epsilon: config.final_epsilon,
            epsilon_decay_steps: config.epsilon_decay_steps,
            learning_starts: config.learning_starts,
            dyna_updates: if config.dyna { config.dyna_updates } else { 0 },
            max_episode_steps: config.max_episode_steps,
            epsilon: config.initial_epsilon,
            q_table: QTable::new(action_count, reward_dim),
            model: config.dyna.then(TabularModel::new),
            global_step: 0,
            num_episodes: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Completed training episodes.
    pub fn num_episodes(&self) -> u64 {
        self.num_episodes
    }

    /// Discount factor.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// The Dyna model, when planning is enabled.
    pub fn model(&self) -> Option<&TabularModel> {
        self.model.as_ref()
    }

    fn greedy(&self, state: &Observation) -> usize {
        argmax_first(&self.q_table.scalarized(state, &self.weight)).unwrap_or(0)
    }

    /// Epsilon-greedy. Unvisited states are explored uniformly.
    fn act(&mut self, state: &Observation) -> usize {
        let actions = self.q_table.action_count();
        if self.rng.gen::<f64>() < self.epsilon || !self.q_table.contains(state) {
            self.rng.gen_range(0..actions)
        } else {
            self.greedy(state)
        }
    }

    /// One TD backup. Returns the per-objective TD error.
    fn backup(
        &mut self,
        state: &Observation,
        action: usize,
        reward: &[f64],
        next_state: &Observation,
        terminal: bool,
    ) -> Vec<f64> {
        let next_action = self.greedy(next_state);
        let max_q = self.q_table.value(next_state, next_action);
        let continuing = if terminal { 0.0 } else { 1.0 };
        let (lr, gamma) = (self.learning_rate, self.gamma);

        let q = &mut self.q_table.entry(state)[action];
        let mut td = Vec::with_capacity(q.len());
        for j in 0..q.len() {
            let err = reward[j] + continuing * gamma * max_q[j] - q[j];
            q[j] += lr * err;
            td.push(err);
        }
        td
    }

    fn update(&mut self, state: &Observation, action: usize, step: &StepOutcome) -> Vec<f64> {
        let td = self.backup(
            state,
            action,
            &step.reward,
            &step.observation,
            step.terminated,
        );

        if let Some(model) = self.model.as_mut() {
            model.update(ModelTransition {
                state: state.clone(),
                action,
                reward: step.reward.clone(),
                next_state: step.observation.clone(),
                terminal: step.terminated,
            });
            for _ in 0..self.dyna_updates {
                let sampled = self
                    .model
                    .as_ref()
                    .and_then(|m| m.random_transition(&mut self.rng))
                    .cloned();
                if let Some(t) = sampled {
                    self.backup(&t.state, t.action, &t.reward, &t.next_state, t.terminal);
                }
            }
        }

        if let Some(decay) = self.epsilon_decay_steps {
            self.epsilon = linearly_decaying_value(
                self.initial_epsilon,
                decay,
                self.global_step,
                self.learning_starts,
                self.final_epsilon,
            );
        }

        td
    }
}

impl ActionSelector for MoQLearning {
    fn decide(&self, state: &Observation, weight: &[f64]) -> Result<usize> {
        Ok(self.eval(state, weight))
    }
}

impl SubPolicy for MoQLearning {
    fn id(&self) -> usize {
        self.id
    }

    fn weight(&self) -> &[f64] {
        &self.weight
    }

    fn train(
        &mut self,
        env: &mut dyn MoEnvironment,
        budget: &TrainBudget,
        mut eval_env: Option<&mut dyn MoEnvironment>,
    ) -> Result<()> {
        if !budget.resume {
            self.global_step = 0;
            self.num_episodes = 0;
        }
        let reward_dim = self.q_table.reward_dim();
        let mut obs = env.reset();

        for _ in 0..budget.total_steps {
            self.global_step += 1;

            let action = self.act(&obs);
            let step = env.step(action)?;
            ensure_dim("reward", reward_dim, step.reward.len())?;
            let td = self.update(&obs, action, &step);

            if self.global_step % TRACE_INTERVAL == 0 {
                debug!(
                    policy = self.id,
                    step = self.global_step,
                    epsilon = self.epsilon,
                    scalarized_td_error = dot(&self.weight, &td),
                    "q-learning progress"
                );
            }

            if budget.eval_frequency > 0 && self.global_step % budget.eval_frequency == 0 {
                if let Some(eval_env) = eval_env.as_deref_mut() {
                    let eval = evaluate_policy(
                        &*self,
                        eval_env,
                        &self.weight,
                        1,
                        self.gamma,
                        self.max_episode_steps,
                    )?;
                    debug!(
                        policy = self.id,
                        step = self.global_step,
                        scalarized_return = eval.scalarized_return,
                        scalarized_discounted_return = eval.scalarized_discounted_return,
                        "greedy evaluation"
                    );
                }
            }

            if step.done() {
                obs = env.reset();
                self.num_episodes += 1;
                if self.global_step % TRACE_INTERVAL == 0 {
                    let elapsed = budget.started_at.elapsed().as_secs_f64().max(1e-9);
                    debug!(
                        policy = self.id,
                        episodes = self.num_episodes,
                        sps = (self.global_step as f64 / elapsed) as u64,
                        "episode finished"
                    );
                }
            } else {
                obs = step.observation;
            }
        }
        Ok(())
    }

    /// Greedy with respect to the policy's own weight; `weight` is ignored.
    /// Ties and unvisited states resolve to the lowest action index.
    fn eval(&self, state: &Observation, _weight: &[f64]) -> usize {
        self.greedy(state)
    }

    fn scalarized_q_values(&self, state: &Observation, weight: &[f64]) -> Vec<f64> {
        self.q_table.scalarized(state, weight)
    }

    fn q_table(&self) -> &QTable {
        &self.q_table
    }

    fn q_table_mut(&mut self) -> &mut QTable {
        &mut self.q_table
    }

    fn set_q_table(&mut self, table: QTable) {
        self.q_table = table;
    }

    fn global_step(&self) -> u64 {
        self.global_step
    }

    fn set_global_step(&mut self, step: u64) {
        self.global_step = step;
    }
}

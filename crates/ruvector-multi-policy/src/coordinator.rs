//! Multi-policy MO Q-learning coordinator.
//!
//! Each outer iteration trains one new tabular Q-learning policy for a
//! selected weight vector, evaluates it, offers its value to the frontier
//! and prunes the pool to what the frontier keeps:
//!
//! ```text
//! SelectWeight -> CreatePolicy -> Train -> Evaluate -> UpdateFrontier -> Prune -> Log
//!      ^                                                                         |
//!      +-------------------------------------------------------------------------+
//! ```
//!
//! After the last iteration the loop enters `Shutdown` and flushes the
//! metric sink. Iterations are strictly sequential; a failing phase
//! abandons the iteration, discards the half-built policy and returns the
//! error.

use crate::config::{MultiPolicyConfig, TrainParams};
use crate::env::{MoEnvironment, Observation};
use crate::error::{MultiPolicyError, Result};
use crate::evaluation::evaluate_policy;
use crate::linear_support::{FrontierService, LinearSupport};
use crate::metrics::FrontMetrics;
use crate::policy::{ActionSelector, SubPolicy, TrainBudget};
use crate::pool::{PolicyPool, RolloutSettings};
use crate::q_learning::MoQLearning;
use crate::sink::{emit_metrics, MetricsSink, TracingSink};
use crate::weights::equally_spaced_weights;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Phase of the outer training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationPhase {
    /// Not training.
    Idle,
    /// Choosing the next weight.
    SelectWeight,
    /// Building the new policy and warm-starting it.
    CreatePolicy,
    /// Training the new policy.
    Train,
    /// Rolling out the new policy.
    Evaluate,
    /// Offering the value to the frontier.
    UpdateFrontier,
    /// Removing policies the frontier dropped.
    Prune,
    /// Computing and emitting front metrics.
    Log,
    /// Training finished, sink flushed.
    Shutdown,
}

impl fmt::Display for IterationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SelectWeight => "select-weight",
            Self::CreatePolicy => "create-policy",
            Self::Train => "train",
            Self::Evaluate => "evaluate",
            Self::UpdateFrontier => "update-frontier",
            Self::Prune => "prune",
            Self::Log => "log",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Outcome of one outer iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Identifier of the policy created in this iteration.
    pub policy_id: usize,
    /// Weight the policy was trained for.
    pub weight: Vec<f64>,
    /// Discounted value vector from evaluation.
    pub value: Vec<f64>,
    /// Pool indices removed after the frontier update, descending.
    pub removed: Vec<usize>,
    /// Pool size after pruning.
    pub pool_size: usize,
    /// Environment steps consumed so far.
    pub global_step: u64,
    /// Front metrics, when logging is enabled.
    pub metrics: Option<FrontMetrics>,
}

/// Summary of a [`MultiPolicyMoq::train`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// One record per completed iteration.
    pub iterations: Vec<IterationRecord>,
    /// Environment steps consumed when training ended.
    pub global_step: u64,
    /// Final frontier values, aligned with the pool.
    pub ccs: Vec<Vec<f64>>,
}

/// Multi-policy multi-objective Q-learning.
///
/// Owns the training environment, the policy pool and its frontier. The
/// frontier defaults to [`LinearSupport`].
pub struct MultiPolicyMoq<E, F = LinearSupport> {
    config: MultiPolicyConfig,
    env: E,
    pool: PolicyPool<MoQLearning, F>,
    global_step: u64,
    next_policy_id: usize,
    rng: StdRng,
    sink: Box<dyn MetricsSink>,
    phase: IterationPhase,
}

impl<E: MoEnvironment + Clone> MultiPolicyMoq<E, LinearSupport> {
    /// Coordinator with a linear-support frontier.
    pub fn new(env: E, config: MultiPolicyConfig) -> Result<Self> {
        let frontier = LinearSupport::new(env.reward_dim(), config.epsilon_ols);
        Self::with_frontier(env, config, frontier)
    }
}

impl<E: MoEnvironment + Clone, F: FrontierService> MultiPolicyMoq<E, F> {
    /// Coordinator around a custom frontier service.
    pub fn with_frontier(env: E, config: MultiPolicyConfig, frontier: F) -> Result<Self> {
        config.validate()?;
        if env.reward_dim() == 0 || env.action_count() == 0 {
            return Err(MultiPolicyError::Configuration(
                "environment must have at least one objective and one action".into(),
            ));
        }
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Ok(Self {
            config,
            env,
            pool: PolicyPool::new(frontier),
            global_step: 0,
            next_policy_id: 0,
            rng,
            sink: Box::new(TracingSink),
            phase: IterationPhase::Idle,
        })
    }

    /// Replace the metric sink.
    pub fn with_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Run `params.iterations` outer iterations.
    ///
    /// Without `eval_env`, evaluation runs on a clone of the training
    /// environment taken once here.
    pub fn train(&mut self, eval_env: Option<E>, params: &TrainParams) -> Result<TrainReport> {
        let k = self.env.reward_dim();
        params.validate(k)?;

        let mut eval_env = eval_env.unwrap_or_else(|| self.env.clone());
        let eval_weights = equally_spaced_weights(k, params.eval_weight_count);
        let rollout = RolloutSettings {
            gamma: self.config.gamma,
            horizon: self.config.max_episode_steps,
            repetitions: params.eval_repetitions,
        };

        info!(
            experiment = %self.config.experiment_name,
            strategy = %self.config.weight_selection,
            iterations = params.iterations,
            steps_per_iteration = params.steps_per_iteration,
            "starting multi-policy training"
        );

        let mut report = TrainReport::default();
        for iteration in 0..params.iterations {
            match self.run_iteration(iteration, &mut eval_env, params, rollout, &eval_weights) {
                Ok(record) => report.iterations.push(record),
                Err(e) => {
                    warn!(iteration, phase = %self.phase, error = %e, "iteration abandoned");
                    self.pool.discard_staged();
                    self.phase = IterationPhase::Idle;
                    if let Err(flush_err) = self.sink.flush() {
                        warn!(error = %flush_err, "metric sink flush failed");
                    }
                    return Err(e);
                }
            }
        }

        self.phase = IterationPhase::Shutdown;
        self.sink.flush()?;
        report.global_step = self.global_step;
        report.ccs = self.pool.ccs().to_vec();
        Ok(report)
    }

    /// Stage a fresh policy for `weight`, warm-started from the pool when
    /// transfer is enabled, and return its id.
    fn create_policy(&mut self, weight: Vec<f64>) -> Result<usize> {
        let policy_id = self.next_policy_id;
        self.next_policy_id += 1;
        let mut policy = MoQLearning::new(
            policy_id,
            weight,
            &self.config,
            self.env.action_count(),
            self.env.reward_dim(),
            self.rng.gen(),
        )?;
        policy.set_global_step(self.global_step);
        self.pool.stage(policy)?;
        if self.config.transfer_q_table && self.pool.warm_start_staged()? {
            debug!(policy = policy_id, "warm-started from pool");
        }
        Ok(policy_id)
    }

    fn run_iteration(
        &mut self,
        iteration: usize,
        eval_env: &mut E,
        params: &TrainParams,
        rollout: RolloutSettings,
        eval_weights: &[Vec<f64>],
    ) -> Result<IterationRecord> {
        let use_gpi = self.config.use_gpi_policy;

        self.phase = IterationPhase::SelectWeight;
        let weight = self.pool.next_weight(
            self.config.weight_selection,
            use_gpi,
            &mut *eval_env,
            rollout,
            &mut self.rng,
        )?;
        debug!(iteration, weight = ?weight, "selected weight");

        self.phase = IterationPhase::CreatePolicy;
        let policy_id = self.create_policy(weight.clone())?;

        self.phase = IterationPhase::Train;
        let policy = self.pool.staged_mut().ok_or_else(|| {
            MultiPolicyError::InvalidState("staged policy vanished before training".into())
        })?;
        let budget = TrainBudget::resuming(params.steps_per_iteration, params.eval_frequency);
        policy.train(&mut self.env, &budget, Some(&mut *eval_env))?;
        self.global_step = policy.global_step();
        debug!(iteration, global_step = self.global_step, "policy trained");

        self.phase = IterationPhase::Evaluate;
        let staged = self.pool.staged().ok_or_else(|| {
            MultiPolicyError::InvalidState("staged policy vanished before evaluation".into())
        })?;
        let value = evaluate_policy(
            staged,
            &mut *eval_env,
            &weight,
            rollout.repetitions,
            rollout.gamma,
            rollout.horizon,
        )?
        .discounted_vec_return;
        debug!(iteration, value = ?value, "policy evaluated");

        self.phase = IterationPhase::UpdateFrontier;
        let removed = self.pool.commit(value.clone())?;
        self.phase = IterationPhase::Prune;
        debug!(iteration, removed = ?removed, pool_size = self.pool.len(), "pool pruned");

        let metrics = if self.config.log {
            self.phase = IterationPhase::Log;
            let front = self.evaluated_front(eval_env, rollout, eval_weights)?;
            Some(emit_metrics(
                self.sink.as_mut(),
                &self.config.experiment_name,
                iteration,
                self.global_step,
                use_gpi,
                front,
                &params.reference_point,
                eval_weights,
                params.known_front.as_deref(),
            )?)
        } else {
            None
        };

        info!(
            iteration,
            policy = policy_id,
            pool_size = self.pool.len(),
            global_step = self.global_step,
            removed = removed.len(),
            "iteration complete"
        );

        Ok(IterationRecord {
            iteration,
            policy_id,
            weight,
            value,
            removed,
            pool_size: self.pool.len(),
            global_step: self.global_step,
            metrics,
        })
    }

    /// The GPI front over `eval_weights` in GPI mode, otherwise the CCS.
    fn evaluated_front(
        &self,
        eval_env: &mut E,
        rollout: RolloutSettings,
        eval_weights: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>> {
        if !self.config.use_gpi_policy {
            return Ok(self.pool.ccs().to_vec());
        }
        if self.pool.is_empty() {
            return Ok(Vec::new());
        }
        let decider = self.pool.decider(true);
        eval_weights
            .iter()
            .map(|w| {
                evaluate_policy(
                    &decider,
                    &mut *eval_env,
                    w,
                    rollout.repetitions,
                    rollout.gamma,
                    rollout.horizon,
                )
                .map(|e| e.discounted_vec_return)
            })
            .collect()
    }

    /// Action for `state` under `weight`: GPI over the pool when configured,
    /// otherwise the greedy action of the best-matching policy.
    pub fn decide(&self, state: &Observation, weight: &[f64]) -> Result<usize> {
        self.pool
            .decider(self.config.use_gpi_policy)
            .decide(state, weight)
    }

    /// Remove pool entries (and their frontier values) by index.
    pub fn remove_policies(&mut self, indices: &[usize]) -> Result<()> {
        self.pool.remove_policies(indices)
    }

    /// Run configuration.
    pub fn config(&self) -> &MultiPolicyConfig {
        &self.config
    }

    /// Current pool.
    pub fn pool(&self) -> &PolicyPool<MoQLearning, F> {
        &self.pool
    }

    /// Current frontier values, aligned with the pool.
    pub fn ccs(&self) -> &[Vec<f64>] {
        self.pool.ccs()
    }

    /// Environment steps consumed across all iterations.
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    /// Loop phase last entered.
    pub fn phase(&self) -> IterationPhase {
        self.phase
    }

    /// Training environment.
    pub fn env(&self) -> &E {
        &self.env
    }
}

impl<E: MoEnvironment + Clone, F: FrontierService> ActionSelector for MultiPolicyMoq<E, F> {
    fn decide(&self, state: &Observation, weight: &[f64]) -> Result<usize> {
        MultiPolicyMoq::decide(self, state, weight)
    }
}

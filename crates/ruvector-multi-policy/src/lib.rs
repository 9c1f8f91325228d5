//! # Multi-Policy Multi-Objective Q-Learning
//!
//! Approximates the convex coverage set (CCS) of a multi-objective
//! environment by training a pool of tabular Q-learning policies, one per
//! weight vector, and keeping only those whose value vectors are optimal for
//! some linear preference.
//!
//! ## Training loop
//!
//! Every iteration:
//!
//! 1. selects a weight (random, OLS or GPI-LS corner weight);
//! 2. creates a Q-learning policy for it, optionally warm-started from the
//!    best-matching pool member's Q-table;
//! 3. trains it, continuing the global step counter;
//! 4. evaluates it with greedy rollouts to a discounted value vector;
//! 5. hands the value to the frontier and prunes the pool to match;
//! 6. logs front metrics (hypervolume, sparsity, expected utility, ...).
//!
//! ## Acting
//!
//! [`MultiPolicyMoq::decide`] answers a `(state, weight)` query either with
//! generalized policy improvement (GPI) over the whole pool or with the
//! greedy action of the member whose value projects highest on the weight.
//!
//! ## Example
//!
//! ```no_run
//! use ruvector_multi_policy::{DeepSeaTreasure, MultiPolicyConfig, MultiPolicyMoq, TrainParams};
//!
//! # fn main() -> ruvector_multi_policy::Result<()> {
//! let config = MultiPolicyConfig::default().with_weight_selection("ols")?;
//! let mut agent = MultiPolicyMoq::new(DeepSeaTreasure::new(), config)?;
//! let report = agent.train(None, &TrainParams::new(vec![0.0, -25.0], 10, 5_000))?;
//! println!("{} policies on the frontier", report.ccs.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod evaluation;
pub mod gpi;
pub mod linear_support;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod q_learning;
pub mod sink;
pub mod transfer;
pub mod weights;

// Re-export core types.
pub use config::{MultiPolicyConfig, TrainParams, WeightSelection};
pub use coordinator::{IterationPhase, IterationRecord, MultiPolicyMoq, TrainReport};
pub use env::{DeepSeaTreasure, MoEnvironment, Observation, StepOutcome};
pub use error::{MultiPolicyError, Result};
pub use evaluation::{evaluate_policy, PolicyEvaluation};
pub use gpi::{gpi_action, gpi_choice, GpiChoice};
pub use linear_support::{FrontierService, GpiProbe, LinearSupport, QueuedWeight};
pub use metrics::FrontMetrics;
pub use policy::{ActionSelector, QTable, SubPolicy, TrainBudget};
pub use pool::{PolicyPool, PoolDecider, PoolEntry, RolloutSettings};
pub use q_learning::MoQLearning;
pub use sink::{FrontRecord, JsonLinesSink, MemorySink, MetricsSink, TracingSink};
pub use weights::{equally_spaced_weights, extrema_weights, random_weights};

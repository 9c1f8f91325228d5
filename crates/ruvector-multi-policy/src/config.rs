//! Configuration for the multi-policy coordinator.
//!
//! Hyper-parameters are shared by every sub-policy the coordinator creates.
//! Everything is (de)serializable so experiments can be described in JSON.

use crate::error::{ensure_dim, MultiPolicyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How the next weight vector is chosen each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightSelection {
    /// Uniform sample from the simplex, independent of history.
    #[serde(rename = "random")]
    Random,
    /// Optimistic linear support.
    #[serde(rename = "ols")]
    Ols,
    /// GPI-guided linear support.
    #[serde(rename = "gpi-ls")]
    GpiLs,
}

impl WeightSelection {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Ols => "ols",
            Self::GpiLs => "gpi-ls",
        }
    }
}

impl fmt::Display for WeightSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightSelection {
    type Err = MultiPolicyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(Self::Random),
            "ols" => Ok(Self::Ols),
            "gpi-ls" => Ok(Self::GpiLs),
            other => Err(MultiPolicyError::Configuration(format!(
                "unknown weight selection algorithm: {other:?} (expected random, ols or gpi-ls)"
            ))),
        }
    }
}

/// Coordinator and sub-policy hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiPolicyConfig {
    /// Q-learning step size (alpha).
    pub learning_rate: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Exploration rate at the start of the decay schedule.
    pub initial_epsilon: f64,
    /// Exploration rate once the schedule is exhausted.
    pub final_epsilon: f64,
    /// Steps over which epsilon decays linearly. `None` keeps it constant.
    pub epsilon_decay_steps: Option<u64>,
    /// Steps before the epsilon schedule starts.
    pub learning_starts: u64,
    /// Weight selection strategy, fixed for the coordinator's lifetime.
    pub weight_selection: WeightSelection,
    /// Minimum corner-weight priority for linear support. `None` means any
    /// strictly positive improvement.
    pub epsilon_ols: Option<f64>,
    /// Act with GPI over the whole pool instead of the best-matching policy.
    pub use_gpi_policy: bool,
    /// Warm-start new Q-tables from the best-matching pool member.
    pub transfer_q_table: bool,
    /// Enable Dyna-Q planning updates.
    pub dyna: bool,
    /// Planning updates per real step when `dyna` is set.
    pub dyna_updates: usize,
    /// Hard cap on evaluation rollout length.
    pub max_episode_steps: usize,
    /// Seed for all randomness. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Compute and emit front metrics after every iteration.
    pub log: bool,
    /// Label attached to emitted metric records.
    pub experiment_name: String,
}

impl Default for MultiPolicyConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            gamma: 0.9,
            initial_epsilon: 0.1,
            final_epsilon: 0.1,
            epsilon_decay_steps: None,
            learning_starts: 0,
            weight_selection: WeightSelection::Random,
            epsilon_ols: None,
            use_gpi_policy: false,
            transfer_q_table: true,
            dyna: false,
            dyna_updates: 5,
            max_episode_steps: 1000,
            seed: None,
            log: true,
            experiment_name: "MultiPolicy MO Q-Learning".to_string(),
        }
    }
}

impl MultiPolicyConfig {
    /// Parse a JSON document. Missing fields take their defaults; an unknown
    /// weight selection name is rejected here.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MultiPolicyError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Set the weight selection strategy by name.
    pub fn with_weight_selection(mut self, name: &str) -> Result<Self> {
        self.weight_selection = name.parse()?;
        Ok(self)
    }

    /// Validate ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(MultiPolicyError::Configuration(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(MultiPolicyError::Configuration(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        for (name, eps) in [
            ("initial_epsilon", self.initial_epsilon),
            ("final_epsilon", self.final_epsilon),
        ] {
            if !(0.0..=1.0).contains(&eps) {
                return Err(MultiPolicyError::Configuration(format!(
                    "{name} must be in [0, 1], got {eps}"
                )));
            }
        }
        if let Some(eps) = self.epsilon_ols {
            if eps.is_nan() || eps < 0.0 {
                return Err(MultiPolicyError::Configuration(format!(
                    "epsilon_ols must be non-negative, got {eps}"
                )));
            }
        }
        if self.max_episode_steps == 0 {
            return Err(MultiPolicyError::Configuration(
                "max_episode_steps must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Flat JSON snapshot of the run configuration, for experiment records.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Arguments of one call to the training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    /// Hypervolume reference point, one entry per objective.
    pub reference_point: Vec<f64>,
    /// Number of outer iterations (one new policy each).
    pub iterations: usize,
    /// Environment steps spent training each new policy.
    pub steps_per_iteration: u64,
    /// Optimal front, if known, for IGD and utility-loss metrics.
    #[serde(default)]
    pub known_front: Option<Vec<Vec<f64>>>,
    /// Weights used to build the GPI front and expected utility.
    #[serde(default = "default_eval_weight_count")]
    pub eval_weight_count: usize,
    /// Steps between greedy evaluations inside sub-policy training.
    #[serde(default = "default_eval_frequency")]
    pub eval_frequency: u64,
    /// Rollouts per policy evaluation.
    #[serde(default = "default_eval_repetitions")]
    pub eval_repetitions: usize,
}

fn default_eval_weight_count() -> usize {
    100
}

fn default_eval_frequency() -> u64 {
    1000
}

fn default_eval_repetitions() -> usize {
    10
}

impl TrainParams {
    /// Parameters with the usual evaluation defaults.
    pub fn new(reference_point: Vec<f64>, iterations: usize, steps_per_iteration: u64) -> Self {
        Self {
            reference_point,
            iterations,
            steps_per_iteration,
            known_front: None,
            eval_weight_count: default_eval_weight_count(),
            eval_frequency: default_eval_frequency(),
            eval_repetitions: default_eval_repetitions(),
        }
    }

    /// Attach a known optimal front.
    pub fn with_known_front(mut self, front: Vec<Vec<f64>>) -> Self {
        self.known_front = Some(front);
        self
    }

    /// Set the number of evaluation rollouts.
    pub fn with_eval_repetitions(mut self, repetitions: usize) -> Self {
        self.eval_repetitions = repetitions;
        self
    }

    /// Set the number of weights used for front evaluation.
    pub fn with_eval_weight_count(mut self, count: usize) -> Self {
        self.eval_weight_count = count;
        self
    }

    /// Set the in-training evaluation period.
    pub fn with_eval_frequency(mut self, steps: u64) -> Self {
        self.eval_frequency = steps;
        self
    }

    /// Check parameters against the environment's objective count.
    pub fn validate(&self, reward_dim: usize) -> Result<()> {
        ensure_dim("reference point", reward_dim, self.reference_point.len())?;
        if let Some(front) = &self.known_front {
            for point in front {
                ensure_dim("known front point", reward_dim, point.len())?;
            }
        }
        if self.eval_repetitions == 0 {
            return Err(MultiPolicyError::Configuration(
                "eval_repetitions must be positive".into(),
            ));
        }
        if self.eval_frequency == 0 {
            return Err(MultiPolicyError::Configuration(
                "eval_frequency must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = MultiPolicyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weight_selection, WeightSelection::Random);
        assert!(config.transfer_q_table);
    }

    #[test]
    fn test_weight_selection_parse() {
        assert_eq!("gpi-ls".parse::<WeightSelection>().unwrap(), WeightSelection::GpiLs);
        assert_eq!("ols".parse::<WeightSelection>().unwrap(), WeightSelection::Ols);
        assert!(matches!(
            "pareto".parse::<WeightSelection>(),
            Err(MultiPolicyError::Configuration(_))
        ));
        assert_eq!(WeightSelection::GpiLs.to_string(), "gpi-ls");
    }

    #[test]
    fn test_from_json_partial() {
        let config = MultiPolicyConfig::from_json(
            r#"{"weight_selection": "gpi-ls", "use_gpi_policy": true, "seed": 3}"#,
        )
        .unwrap();
        assert_eq!(config.weight_selection, WeightSelection::GpiLs);
        assert!(config.use_gpi_policy);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.gamma, 0.9);
    }

    #[test]
    fn test_from_json_rejects_unknown_algorithm() {
        let err = MultiPolicyConfig::from_json(r#"{"weight_selection": "pgmorl"}"#).unwrap_err();
        assert!(matches!(err, MultiPolicyError::Configuration(_)));
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = MultiPolicyConfig::default();
        config.gamma = 1.5;
        assert!(config.validate().is_err());

        let mut config = MultiPolicyConfig::default();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = MultiPolicyConfig::default();
        config.epsilon_ols = Some(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"weight_selection": "ols", "dyna": true}"#).unwrap();
        let config = MultiPolicyConfig::from_file(&path).unwrap();
        assert_eq!(config.weight_selection, WeightSelection::Ols);
        assert!(config.dyna);
    }

    #[test]
    fn test_snapshot_names_algorithm() {
        let config = MultiPolicyConfig::default()
            .with_weight_selection("gpi-ls")
            .unwrap();
        let snapshot = config.to_json_value().unwrap();
        assert_eq!(snapshot["weight_selection"], "gpi-ls");

        let restored: MultiPolicyConfig = serde_json::from_value(snapshot).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_train_params_dimensions() {
        let params = TrainParams::new(vec![0.0, -25.0], 3, 100);
        assert!(params.validate(2).is_ok());
        assert!(matches!(
            params.validate(3),
            Err(MultiPolicyError::DimensionMismatch { .. })
        ));

        let params = TrainParams::new(vec![0.0, -25.0], 3, 100)
            .with_known_front(vec![vec![1.0, 2.0, 3.0]]);
        assert!(params.validate(2).is_err());
    }
}

//! Rollout-based multi-objective policy evaluation.

use crate::env::MoEnvironment;
use crate::error::{ensure_dim, MultiPolicyError, Result};
use crate::policy::ActionSelector;
use crate::weights::dot;
use serde::{Deserialize, Serialize};

/// Average returns of an agent over one or more greedy episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    /// `w · vec_return`.
    pub scalarized_return: f64,
    /// `w · discounted_vec_return`.
    pub scalarized_discounted_return: f64,
    /// Undiscounted per-objective return.
    pub vec_return: Vec<f64>,
    /// Discounted per-objective return. This is the value vector the
    /// frontier consumes.
    pub discounted_vec_return: Vec<f64>,
}

/// Run one episode acting with `agent` under `weight`.
///
/// The episode ends on termination, truncation, or after `horizon` steps.
pub fn run_episode(
    agent: &dyn ActionSelector,
    env: &mut dyn MoEnvironment,
    weight: &[f64],
    gamma: f64,
    horizon: usize,
) -> Result<PolicyEvaluation> {
    let dim = env.reward_dim();
    ensure_dim("evaluation weight", dim, weight.len())?;

    let mut obs = env.reset();
    let mut vec_return = vec![0.0; dim];
    let mut discounted = vec![0.0; dim];
    let mut discount = 1.0;

    for _ in 0..horizon {
        let action = agent.decide(&obs, weight)?;
        let step = env.step(action)?;
        ensure_dim("reward", dim, step.reward.len())?;

        for (j, r) in step.reward.iter().enumerate() {
            vec_return[j] += r;
            discounted[j] += discount * r;
        }
        discount *= gamma;

        if step.done() {
            break;
        }
        obs = step.observation;
    }

    Ok(PolicyEvaluation {
        scalarized_return: dot(weight, &vec_return),
        scalarized_discounted_return: dot(weight, &discounted),
        vec_return,
        discounted_vec_return: discounted,
    })
}

/// Average of `repetitions` greedy episodes.
pub fn evaluate_policy(
    agent: &dyn ActionSelector,
    env: &mut dyn MoEnvironment,
    weight: &[f64],
    repetitions: usize,
    gamma: f64,
    horizon: usize,
) -> Result<PolicyEvaluation> {
    if repetitions == 0 {
        return Err(MultiPolicyError::Configuration(
            "evaluation needs at least one repetition".into(),
        ));
    }

    let dim = env.reward_dim();
    let mut total = PolicyEvaluation {
        scalarized_return: 0.0,
        scalarized_discounted_return: 0.0,
        vec_return: vec![0.0; dim],
        discounted_vec_return: vec![0.0; dim],
    };

    for _ in 0..repetitions {
        let episode = run_episode(agent, env, weight, gamma, horizon)?;
        total.scalarized_return += episode.scalarized_return;
        total.scalarized_discounted_return += episode.scalarized_discounted_return;
        for j in 0..dim {
            total.vec_return[j] += episode.vec_return[j];
            total.discounted_vec_return[j] += episode.discounted_vec_return[j];
        }
    }

    let n = repetitions as f64;
    total.scalarized_return /= n;
    total.scalarized_discounted_return /= n;
    total.vec_return.iter_mut().for_each(|x| *x /= n);
    total.discounted_vec_return.iter_mut().for_each(|x| *x /= n);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{DeepSeaTreasure, Observation};

    /// Always moves down: reaches the first treasure in one step.
    struct Down;

    impl ActionSelector for Down {
        fn decide(&self, _state: &Observation, _weight: &[f64]) -> Result<usize> {
            Ok(1)
        }
    }

    /// Always moves right along the surface and never terminates.
    struct Right;

    impl ActionSelector for Right {
        fn decide(&self, _state: &Observation, _weight: &[f64]) -> Result<usize> {
            Ok(3)
        }
    }

    #[test]
    fn test_single_step_episode() {
        let mut env = DeepSeaTreasure::new();
        let eval = evaluate_policy(&Down, &mut env, &[0.5, 0.5], 3, 0.9, 100).unwrap();
        assert_eq!(eval.vec_return, vec![0.7, -1.0]);
        assert_eq!(eval.discounted_vec_return, vec![0.7, -1.0]);
        assert!((eval.scalarized_return + 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_horizon_caps_episode() {
        let mut env = DeepSeaTreasure::with_max_steps(1000);
        let eval = run_episode(&Right, &mut env, &[0.0, 1.0], 1.0, 7).unwrap();
        assert_eq!(eval.vec_return, vec![0.0, -7.0]);
    }

    #[test]
    fn test_discounting() {
        let mut env = DeepSeaTreasure::with_max_steps(3);
        let eval = run_episode(&Right, &mut env, &[0.0, 1.0], 0.5, 100).unwrap();
        // -1 - 0.5 - 0.25
        assert!((eval.discounted_vec_return[1] + 1.75).abs() < 1e-12);
        assert_eq!(eval.vec_return[1], -3.0);
    }

    #[test]
    fn test_weight_dimension_checked() {
        let mut env = DeepSeaTreasure::new();
        let err = evaluate_policy(&Down, &mut env, &[1.0, 0.0, 0.0], 1, 0.9, 10).unwrap_err();
        assert!(matches!(err, MultiPolicyError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let mut env = DeepSeaTreasure::new();
        assert!(evaluate_policy(&Down, &mut env, &[1.0, 0.0], 0, 0.9, 10).is_err());
    }
}

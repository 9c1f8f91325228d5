//! Generalized policy improvement (GPI) over a set of sub-policies.
//!
//! For a state `s` and weight `w`, GPI acts with
//! `argmax_a max_π w · Q_π(s, a)`: every pool member votes with its own
//! Q-table, scalarized under the *requested* weight, and the single best
//! (policy, action) pair wins. The resulting policy is at least as good
//! under `w` as any member it was built from.
//!
//! Ties are resolved row-major: lower policy index first, then lower action
//! index.

use crate::env::Observation;
use crate::error::{ensure_dim, MultiPolicyError, Result};
use crate::policy::SubPolicy;

/// Outcome of one GPI decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpiChoice {
    /// Position of the winning policy in the iteration order.
    pub policy_index: usize,
    /// Chosen action.
    pub action: usize,
    /// Winning scalarized value.
    pub value: f64,
}

/// GPI decision over `policies`.
///
/// Fails with [`MultiPolicyError::InvalidState`] when `policies` is empty.
pub fn gpi_choice<'a, P, I>(policies: I, state: &Observation, weight: &[f64]) -> Result<GpiChoice>
where
    P: SubPolicy + ?Sized + 'a,
    I: IntoIterator<Item = &'a P>,
{
    let mut best: Option<GpiChoice> = None;
    for (policy_index, policy) in policies.into_iter().enumerate() {
        ensure_dim("gpi weight", policy.weight().len(), weight.len())?;
        let values = policy.scalarized_q_values(state, weight);
        for (action, &value) in values.iter().enumerate() {
            if best.map_or(true, |b| value > b.value) {
                best = Some(GpiChoice {
                    policy_index,
                    action,
                    value,
                });
            }
        }
    }
    best.ok_or_else(|| MultiPolicyError::InvalidState("gpi over an empty policy set".into()))
}

/// GPI action over `policies`.
pub fn gpi_action<'a, P, I>(policies: I, state: &Observation, weight: &[f64]) -> Result<usize>
where
    P: SubPolicy + ?Sized + 'a,
    I: IntoIterator<Item = &'a P>,
{
    gpi_choice(policies, state, weight).map(|choice| choice.action)
}

//! Policy pool coupled to its frontier.
//!
//! [`PolicyPool`] owns both the trained sub-policies and the frontier
//! service, and keeps them index-aligned: entry `i` is the policy whose
//! evaluation produced CCS value `i`. Mutation goes through three paths:
//!
//! - [`PolicyPool::stage`] appends a freshly created policy that has not been
//!   evaluated yet (at most one at a time);
//! - [`PolicyPool::commit`] hands its value to the frontier and removes the
//!   entries the frontier drops, including possibly the staged one;
//! - [`PolicyPool::remove_policies`] removes the same indices from both.
//!
//! Every removal validates all indices first and applies them high-to-low,
//! so an out-of-range index aborts without touching either side.

use crate::config::WeightSelection;
use crate::env::{MoEnvironment, Observation};
use crate::error::{ensure_dim, MultiPolicyError, Result};
use crate::gpi::gpi_action;
use crate::linear_support::{FrontierService, GpiProbe};
use crate::policy::{ActionSelector, SubPolicy};
use crate::transfer::{best_projection, warm_start};
use crate::weights::random_weights;
use rand::rngs::StdRng;
use tracing::debug;

/// One pool member.
#[derive(Debug, Clone)]
pub struct PoolEntry<P> {
    /// Identifier of the policy.
    pub id: usize,
    /// Weight the policy was trained for.
    pub weight: Vec<f64>,
    /// The policy itself.
    pub policy: P,
}

/// Rollout settings shared by frontier probes and front evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutSettings {
    /// Discount for value estimates.
    pub gamma: f64,
    /// Episode length cap.
    pub horizon: usize,
    /// Episodes averaged per evaluation.
    pub repetitions: usize,
}

/// Sub-policies index-aligned with a frontier service.
#[derive(Debug)]
pub struct PolicyPool<P, F> {
    entries: Vec<PoolEntry<P>>,
    frontier: F,
}

impl<P: SubPolicy, F: FrontierService> PolicyPool<P, F> {
    /// Empty pool around `frontier`.
    pub fn new(frontier: F) -> Self {
        Self {
            entries: Vec::new(),
            frontier,
        }
    }

    /// Committed entries.
    pub fn len(&self) -> usize {
        self.committed().len()
    }

    /// Whether no entry is committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed entries, aligned with [`Self::ccs`].
    pub fn entries(&self) -> &[PoolEntry<P>] {
        self.committed()
    }

    /// Iterate over committed policies.
    pub fn policies(&self) -> impl Iterator<Item = &P> {
        self.committed().iter().map(|entry| &entry.policy)
    }

    /// Frontier values, aligned with [`Self::entries`].
    pub fn ccs(&self) -> &[Vec<f64>] {
        self.frontier.ccs()
    }

    /// Read access to the frontier service.
    pub fn frontier(&self) -> &F {
        &self.frontier
    }

    fn committed(&self) -> &[PoolEntry<P>] {
        let n = self.frontier.ccs().len().min(self.entries.len());
        &self.entries[..n]
    }

    fn has_staged(&self) -> bool {
        self.entries.len() > self.frontier.ccs().len()
    }

    /// Decision rule over the committed entries.
    pub fn decider(&self, use_gpi: bool) -> PoolDecider<'_, P> {
        PoolDecider {
            entries: self.committed(),
            ccs: self.frontier.ccs(),
            use_gpi,
        }
    }

    /// Index of the committed entry whose value projects highest on `weight`.
    pub fn best_match(&self, weight: &[f64]) -> Result<usize> {
        best_projection(self.ccs(), weight)?
            .ok_or_else(|| MultiPolicyError::InvalidState("best match on an empty pool".into()))
    }

    /// Overwrite the staged policy's Q-table with a deep copy from the
    /// committed entry whose value projects highest on its weight.
    ///
    /// Returns whether a table was copied; `false` on an empty pool.
    pub fn warm_start_staged(&mut self) -> Result<bool> {
        if !self.has_staged() {
            return Err(MultiPolicyError::InvalidState(
                "warm start without a staged policy".into(),
            ));
        }
        let ccs = self.frontier.ccs();
        let Some((staged, committed)) = self.entries.split_last_mut() else {
            return Ok(false);
        };
        warm_start(
            &mut staged.policy,
            committed.iter().map(|entry| &entry.policy),
            ccs,
        )
    }

    /// Propose the next training weight.
    ///
    /// `random` samples the simplex directly; `ols` and `gpi-ls` consult the
    /// frontier, the latter probing it with this pool's decision rule on
    /// `eval_env`.
    pub fn next_weight(
        &mut self,
        strategy: WeightSelection,
        use_gpi: bool,
        eval_env: &mut dyn MoEnvironment,
        rollout: RolloutSettings,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        if self.has_staged() {
            return Err(MultiPolicyError::InvalidState(
                "weight selection while a policy is staged".into(),
            ));
        }
        match strategy {
            WeightSelection::Random => Ok(random_weights(eval_env.reward_dim(), rng)),
            WeightSelection::Ols => {
                self.frontier
                    .next_weight(strategy, None, rollout.repetitions, rng)
            }
            WeightSelection::GpiLs => {
                let ccs = self.frontier.ccs().to_vec();
                let decider = PoolDecider {
                    entries: &self.entries,
                    ccs: &ccs,
                    use_gpi,
                };
                let probe = GpiProbe {
                    agent: &decider,
                    env: eval_env,
                    gamma: rollout.gamma,
                    horizon: rollout.horizon,
                };
                self.frontier
                    .next_weight(strategy, Some(probe), rollout.repetitions, rng)
            }
        }
    }

    /// Append a policy awaiting evaluation.
    pub fn stage(&mut self, policy: P) -> Result<&mut P> {
        if self.has_staged() {
            return Err(MultiPolicyError::InvalidState(
                "a policy is already staged".into(),
            ));
        }
        let entry = PoolEntry {
            id: policy.id(),
            weight: policy.weight().to_vec(),
            policy,
        };
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        Ok(&mut self.entries[index].policy)
    }

    /// The staged policy, if any.
    pub fn staged(&self) -> Option<&P> {
        if self.has_staged() {
            self.entries.last().map(|entry| &entry.policy)
        } else {
            None
        }
    }

    /// Mutable access to the staged policy, if any.
    pub fn staged_mut(&mut self) -> Option<&mut P> {
        if self.has_staged() {
            self.entries.last_mut().map(|entry| &mut entry.policy)
        } else {
            None
        }
    }

    /// Drop the staged policy without touching the frontier.
    pub fn discard_staged(&mut self) -> Option<P> {
        if self.has_staged() {
            self.entries.pop().map(|entry| entry.policy)
        } else {
            None
        }
    }

    /// Submit the staged policy's value to the frontier and prune.
    ///
    /// Returns the indices removed from the pool, descending.
    pub fn commit(&mut self, value: Vec<f64>) -> Result<Vec<usize>> {
        let weight = match self.entries.last() {
            Some(entry) if self.has_staged() => entry.weight.clone(),
            _ => {
                return Err(MultiPolicyError::InvalidState(
                    "commit without a staged policy".into(),
                ))
            }
        };
        ensure_dim("frontier value", weight.len(), value.len())?;

        let removed = self.frontier.add_solution(value, weight)?;
        let indices = validated_indices(&removed, self.entries.len())?;
        for &i in &indices {
            let entry = self.entries.remove(i);
            debug!(index = i, policy = entry.id, "pruned policy");
        }
        self.check_alignment()?;
        Ok(indices)
    }

    /// Remove committed entries and their frontier values.
    ///
    /// Indices may come in any order and may repeat; the result is the same
    /// as removing each distinct index once, highest first.
    pub fn remove_policies(&mut self, indices: &[usize]) -> Result<()> {
        if self.has_staged() {
            return Err(MultiPolicyError::InvalidState(
                "removal while a policy is staged".into(),
            ));
        }
        let indices = validated_indices(indices, self.entries.len())?;
        self.frontier.remove_solutions(&indices)?;
        for &i in &indices {
            self.entries.remove(i);
        }
        self.check_alignment()
    }

    fn check_alignment(&self) -> Result<()> {
        let (entries, values) = (self.entries.len(), self.frontier.ccs().len());
        if entries != values {
            return Err(MultiPolicyError::InvariantViolation(format!(
                "pool holds {entries} policies but frontier holds {values} values"
            )));
        }
        Ok(())
    }
}

/// Sorted-descending, deduplicated copy of `indices`, all below `len`.
fn validated_indices(indices: &[usize], len: usize) -> Result<Vec<usize>> {
    if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
        return Err(MultiPolicyError::InvariantViolation(format!(
            "pool index {bad} out of range for {len} entries"
        )));
    }
    let mut sorted = indices.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    Ok(sorted)
}

/// The pool's decision rule as a standalone [`ActionSelector`].
///
/// GPI over every entry when `use_gpi` is set; otherwise the entry whose
/// frontier value projects highest on the query weight acts greedily.
pub struct PoolDecider<'a, P> {
    entries: &'a [PoolEntry<P>],
    ccs: &'a [Vec<f64>],
    use_gpi: bool,
}

impl<P: SubPolicy> ActionSelector for PoolDecider<'_, P> {
    fn decide(&self, state: &Observation, weight: &[f64]) -> Result<usize> {
        if self.entries.is_empty() {
            return Err(MultiPolicyError::InvalidState(
                "decision requested from an empty pool".into(),
            ));
        }
        if self.use_gpi {
            return gpi_action(self.entries.iter().map(|e| &e.policy), state, weight);
        }
        let index = best_projection(self.ccs, weight)?.ok_or_else(|| {
            MultiPolicyError::InvalidState("decision requested from an empty pool".into())
        })?;
        let entry = self.entries.get(index).ok_or_else(|| {
            MultiPolicyError::InvariantViolation(format!(
                "best match {index} has no pool entry"
            ))
        })?;
        Ok(entry.policy.eval(state, weight))
    }
}

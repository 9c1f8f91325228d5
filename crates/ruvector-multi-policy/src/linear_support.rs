//! Linear support: incremental convex coverage set (CCS) construction.
//!
//! The CCS is the set of value vectors that are optimal for at least one
//! weight under linear scalarization. Its scalarized upper surface
//! `max_i w · v_i` is piecewise linear over the weight simplex; the weights
//! at its vertices ("corner weights") are where a new policy can improve the
//! surface the most, so linear support trains there next.
//!
//! Two priority rules rank corner weights:
//!
//! - **OLS** (optimistic linear support): optimistic upper bound at the
//!   corner, derived from the values already found at visited weights, minus
//!   the current CCS value.
//! - **GPI-LS**: value of the GPI policy over the whole pool at the corner
//!   (measured with rollouts) minus the current CCS value.
//!
//! Corner weights are enumerated as the vertices of
//! `{(w, c) : Σw = 1, w ≥ 0, w · v_i ≤ c}` by solving every `(k+1)`-square
//! system of active constraints. Exact, and cheap for the CCS sizes a
//! tabular run produces.

use crate::config::WeightSelection;
use crate::env::MoEnvironment;
use crate::error::{ensure_dim, MultiPolicyError, Result};
use crate::evaluation::evaluate_policy;
use crate::policy::ActionSelector;
use crate::weights::{dot, extrema_weights, random_weights};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Numerical tolerance for feasibility and equality tests.
const TOL: f64 = 1e-9;

/// The GPI capability handed to the frontier by GPI-LS: a decision rule over
/// the whole pool and an environment to roll it out in.
pub struct GpiProbe<'a> {
    /// Decision rule to evaluate at candidate weights.
    pub agent: &'a dyn ActionSelector,
    /// Evaluation environment.
    pub env: &'a mut dyn MoEnvironment,
    /// Discount used for the value estimate.
    pub gamma: f64,
    /// Rollout length cap.
    pub horizon: usize,
}

/// Frontier maintenance as seen by the coordinator.
pub trait FrontierService {
    /// Propose the weight to train next.
    ///
    /// `probe` must be present for [`WeightSelection::GpiLs`] and is ignored
    /// otherwise. `eval_repetitions` is the rollout count for any evaluation
    /// the service performs.
    fn next_weight(
        &mut self,
        strategy: WeightSelection,
        probe: Option<GpiProbe<'_>>,
        eval_repetitions: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>>;

    /// Add the value found for `weight`.
    ///
    /// Returns the CCS indices that are no longer needed, in descending
    /// order. Index `ccs().len()` (as it was before the call) refers to the
    /// submitted value itself and means it was rejected.
    fn add_solution(&mut self, value: Vec<f64>, weight: Vec<f64>) -> Result<Vec<usize>>;

    /// Drop CCS entries by index. `indices` must be in range, unique and
    /// sorted descending.
    fn remove_solutions(&mut self, indices: &[usize]) -> Result<()>;

    /// Current CCS, in insertion order.
    fn ccs(&self) -> &[Vec<f64>];
}

/// A candidate weight with its priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedWeight {
    /// Expected improvement from training at `weight`.
    pub priority: f64,
    /// Candidate weight.
    pub weight: Vec<f64>,
}

/// Optimistic / GPI-guided linear support.
#[derive(Debug, Clone)]
pub struct LinearSupport {
    num_objectives: usize,
    epsilon: Option<f64>,
    ccs: Vec<Vec<f64>>,
    weight_support: Vec<Vec<f64>>,
    visited_weights: Vec<Vec<f64>>,
    queue: Vec<QueuedWeight>,
    queue_stale: bool,
    iteration: usize,
}

impl LinearSupport {
    /// Empty CCS. The queue starts with the extremum weights.
    ///
    /// `epsilon` is the minimum priority a corner weight needs to be queued.
    pub fn new(num_objectives: usize, epsilon: Option<f64>) -> Self {
        let queue = extrema_weights(num_objectives)
            .into_iter()
            .map(|weight| QueuedWeight {
                priority: f64::INFINITY,
                weight,
            })
            .collect();
        Self {
            num_objectives,
            epsilon,
            ccs: Vec::new(),
            weight_support: Vec::new(),
            visited_weights: Vec::new(),
            queue,
            queue_stale: false,
            iteration: 0,
        }
    }

    /// Number of objectives.
    pub fn num_objectives(&self) -> usize {
        self.num_objectives
    }

    /// Weight at which each CCS entry was found (aligned with [`Self::ccs`]).
    pub fn weight_support(&self) -> &[Vec<f64>] {
        &self.weight_support
    }

    /// Every weight submitted through `add_solution`.
    pub fn visited_weights(&self) -> &[Vec<f64>] {
        &self.visited_weights
    }

    /// Pending candidate weights.
    pub fn queue(&self) -> &[QueuedWeight] {
        &self.queue
    }

    /// Number of `add_solution` calls.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// `max_{v ∈ CCS} w · v`, or `None` for an empty CCS.
    pub fn max_scalarized_value(&self, weight: &[f64]) -> Option<f64> {
        self.ccs
            .iter()
            .map(|v| dot(weight, v))
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.max(x))))
    }

    /// A value is dominated if no visited weight scalarizes it at least as
    /// high as the current CCS does.
    pub fn is_dominated(&self, value: &[f64]) -> bool {
        if self.ccs.is_empty() {
            return false;
        }
        !self.visited_weights.iter().any(|w| {
            self.max_scalarized_value(w)
                .map_or(true, |best| dot(w, value) >= best)
        })
    }

    /// Vertices of the CCS upper surface over the simplex.
    pub fn corner_weights(&self) -> Vec<Vec<f64>> {
        let k = self.num_objectives;
        if k == 0 || self.ccs.is_empty() {
            return extrema_weights(k);
        }
        let n = self.ccs.len();
        let mut corners: Vec<Vec<f64>> = Vec::new();

        // Constraints 0..n: w·v_i - c = 0; constraints n..n+k: w_j = 0.
        for_each_combination(n + k, k, |active| {
            let mut a = Vec::with_capacity(k + 1);
            let mut b = Vec::with_capacity(k + 1);
            for &idx in active {
                let mut row = vec![0.0; k + 1];
                if idx < n {
                    row[..k].copy_from_slice(&self.ccs[idx]);
                    row[k] = -1.0;
                } else {
                    row[idx - n] = 1.0;
                }
                a.push(row);
                b.push(0.0);
            }
            let mut simplex = vec![1.0; k + 1];
            simplex[k] = 0.0;
            a.push(simplex);
            b.push(1.0);

            let Some(x) = solve_linear(a, b) else {
                return;
            };
            let (w, c) = (&x[..k], x[k]);
            if w.iter().any(|&wj| wj < -TOL) {
                return;
            }
            if self.ccs.iter().any(|v| dot(w, v) > c + 1e-7) {
                return;
            }
            let w = clean_weight(w);
            if !corners.iter().any(|existing| approx_eq(existing, &w)) {
                corners.push(w);
            }
        });
        corners
    }

    /// Optimistic upper bound on the achievable scalarized value at `weight`.
    ///
    /// Any value vector `v` consistent with what was found so far satisfies
    /// `w_i · v ≤ u_i` at every visited weight `w_i` (with `u_i` the CCS
    /// value there). The bound is `max w · v` under those constraints, which
    /// by LP duality is the cheapest convex combination of visited weights
    /// reproducing `weight`. Infinite if `weight` lies outside their hull.
    pub fn optimistic_value(&self, weight: &[f64]) -> f64 {
        let k = self.num_objectives;
        let visited: Vec<(&Vec<f64>, f64)> = self
            .visited_weights
            .iter()
            .filter_map(|w| self.max_scalarized_value(w).map(|u| (w, u)))
            .collect();
        let mut best = f64::INFINITY;

        for size in 1..=k.min(visited.len()) {
            for_each_combination(visited.len(), size, |subset| {
                // Normal equations G λ = W_S w.
                let gram: Vec<Vec<f64>> = subset
                    .iter()
                    .map(|&a| subset.iter().map(|&b| dot(visited[a].0, visited[b].0)).collect())
                    .collect();
                let rhs: Vec<f64> = subset.iter().map(|&a| dot(visited[a].0, weight)).collect();
                let Some(lambda) = solve_linear(gram, rhs) else {
                    return;
                };
                if lambda.iter().any(|&l| l < -TOL) {
                    return;
                }
                let residual: f64 = (0..k)
                    .map(|j| {
                        let fit: f64 = subset
                            .iter()
                            .zip(&lambda)
                            .map(|(&i, l)| l * visited[i].0[j])
                            .sum();
                        (fit - weight[j]).powi(2)
                    })
                    .sum();
                if residual.sqrt() > 1e-7 {
                    return;
                }
                let bound: f64 = subset.iter().zip(&lambda).map(|(&i, l)| l * visited[i].1).sum();
                best = best.min(bound);
            });
        }
        best
    }

    /// OLS priority: optimistic bound minus the current CCS value.
    pub fn ols_priority(&self, weight: &[f64]) -> f64 {
        match self.max_scalarized_value(weight) {
            Some(current) => self.optimistic_value(weight) - current,
            None => f64::INFINITY,
        }
    }

    fn accepts(&self, priority: f64) -> bool {
        match self.epsilon {
            Some(eps) => priority > eps,
            None => priority > TOL,
        }
    }

    fn is_visited(&self, weight: &[f64]) -> bool {
        self.visited_weights.iter().any(|w| approx_eq(w, weight))
    }

    fn rebuild_ols_queue(&mut self) {
        let mut queue = Vec::new();
        for weight in self.corner_weights() {
            if self.is_visited(&weight) {
                continue;
            }
            let priority = self.ols_priority(&weight);
            if self.accepts(priority) {
                queue.push(QueuedWeight { priority, weight });
            }
        }
        debug!(candidates = queue.len(), "ols queue rebuilt");
        self.queue = queue;
        self.queue_stale = false;
    }

    fn rebuild_gpi_queue(&mut self, probe: GpiProbe<'_>, eval_repetitions: usize) -> Result<()> {
        let mut queue = Vec::new();
        for weight in self.corner_weights() {
            if self.is_visited(&weight) {
                continue;
            }
            let gpi_value = evaluate_policy(
                probe.agent,
                &mut *probe.env,
                &weight,
                eval_repetitions,
                probe.gamma,
                probe.horizon,
            )?
            .discounted_vec_return;
            let current = self.max_scalarized_value(&weight).unwrap_or(f64::NEG_INFINITY);
            let priority = dot(&weight, &gpi_value) - current;
            if self.accepts(priority) {
                queue.push(QueuedWeight { priority, weight });
            }
        }
        debug!(candidates = queue.len(), "gpi-ls queue rebuilt");
        self.queue = queue;
        self.queue_stale = false;
        Ok(())
    }

    /// Remove and return the highest-priority weight (earliest on ties).
    fn pop_best(&mut self) -> Option<QueuedWeight> {
        let mut best: Option<usize> = None;
        for (i, candidate) in self.queue.iter().enumerate() {
            if best.map_or(true, |b| candidate.priority > self.queue[b].priority) {
                best = Some(i);
            }
        }
        best.map(|i| self.queue.remove(i))
    }

    /// Drop CCS entries that are no longer strictly best at any visited
    /// weight once `value` joins. Returns removed indices, descending.
    fn remove_obsolete_values(&mut self, value: &[f64]) -> Vec<usize> {
        let mut removed = Vec::new();
        for i in (0..self.ccs.len()).rev() {
            let still_optimal = self.visited_weights.iter().any(|w| {
                let own = dot(&self.ccs[i], w);
                let best = self.max_scalarized_value(w).unwrap_or(f64::NEG_INFINITY);
                (own - best).abs() <= TOL && dot(value, w) < own
            });
            if !still_optimal {
                debug!(index = i, value = ?self.ccs[i], "removing obsolete ccs value");
                self.ccs.remove(i);
                self.weight_support.remove(i);
                removed.push(i);
            }
        }
        removed
    }
}

impl FrontierService for LinearSupport {
    fn next_weight(
        &mut self,
        strategy: WeightSelection,
        probe: Option<GpiProbe<'_>>,
        eval_repetitions: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        match strategy {
            WeightSelection::Random => {
                return Err(MultiPolicyError::Configuration(
                    "random weight selection does not consult linear support".into(),
                ))
            }
            WeightSelection::Ols => {
                if self.queue_stale {
                    self.rebuild_ols_queue();
                }
            }
            WeightSelection::GpiLs => {
                let probe = probe.ok_or_else(|| {
                    MultiPolicyError::InvalidState("gpi-ls needs a GPI probe".into())
                })?;
                // Before the first solution only the extrema are queued.
                if !self.ccs.is_empty() {
                    self.rebuild_gpi_queue(probe, eval_repetitions)?;
                }
            }
        }

        match self.pop_best() {
            Some(next) => {
                debug!(weight = ?next.weight, priority = next.priority, "next corner weight");
                Ok(next.weight)
            }
            None => {
                let weight = random_weights(self.num_objectives, rng);
                warn!(weight = ?weight, "no corner weight left to explore, sampling at random");
                Ok(weight)
            }
        }
    }

    fn add_solution(&mut self, value: Vec<f64>, weight: Vec<f64>) -> Result<Vec<usize>> {
        ensure_dim("frontier value", self.num_objectives, value.len())?;
        ensure_dim("frontier weight", self.num_objectives, weight.len())?;

        self.iteration += 1;
        self.visited_weights.push(weight.clone());
        self.queue_stale = true;

        if self.is_dominated(&value) {
            debug!(value = ?value, "value is dominated, discarding");
            return Ok(vec![self.ccs.len()]);
        }
        if self.ccs.iter().any(|v| approx_eq(v, &value)) {
            debug!(value = ?value, "value already in ccs, discarding");
            return Ok(vec![self.ccs.len()]);
        }

        let removed = self.remove_obsolete_values(&value);
        self.ccs.push(value);
        self.weight_support.push(weight);
        Ok(removed)
    }

    fn remove_solutions(&mut self, indices: &[usize]) -> Result<()> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.ccs.len()) {
            return Err(MultiPolicyError::InvariantViolation(format!(
                "ccs index {bad} out of range for {} entries",
                self.ccs.len()
            )));
        }
        for &i in indices {
            self.ccs.remove(i);
            self.weight_support.remove(i);
        }
        self.queue_stale = true;
        Ok(())
    }

    fn ccs(&self) -> &[Vec<f64>] {
        &self.ccs
    }
}

fn approx_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-8)
}

/// Clamp round-off negatives and renormalize onto the simplex.
fn clean_weight(w: &[f64]) -> Vec<f64> {
    let clamped: Vec<f64> = w.iter().map(|&x| if x.abs() < TOL { 0.0 } else { x.max(0.0) }).collect();
    let total: f64 = clamped.iter().sum();
    if total <= 0.0 {
        return clamped;
    }
    clamped.into_iter().map(|x| x / total).collect()
}

/// Call `f` with every `size`-subset of `0..n`, in lexicographic order.
fn for_each_combination(n: usize, size: usize, mut f: impl FnMut(&[usize])) {
    if size > n {
        return;
    }
    let mut idx: Vec<usize> = (0..size).collect();
    loop {
        f(&idx);
        // Rightmost position that can still advance.
        let Some(pos) = (0..size).rev().find(|&i| idx[i] < n - size + i) else {
            return;
        };
        idx[pos] += 1;
        for j in pos + 1..size {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Gaussian elimination with partial pivoting. `None` if singular.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (k, p) in pivot_row.iter().enumerate().skip(col) {
                a[row][k] -= factor * p;
            }
            b[row] -= factor * pivot_rhs;
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{DeepSeaTreasure, Observation};
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        approx_eq(a, b)
    }

    #[test]
    fn test_combinations() {
        let mut seen = Vec::new();
        for_each_combination(4, 2, |c| seen.push(c.to_vec()));
        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        let mut count = 0;
        for_each_combination(2, 3, |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_solve_linear() {
        let x = solve_linear(vec![vec![2.0, 1.0], vec![1.0, 3.0]], vec![3.0, 5.0]).unwrap();
        assert!(close(&x, &[0.8, 1.4]));
        assert!(solve_linear(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_extrema_first() {
        let mut ls = LinearSupport::new(2, None);
        let w = ls.next_weight(WeightSelection::Ols, None, 1, &mut rng()).unwrap();
        assert_eq!(w, vec![1.0, 0.0]);
    }

    #[test]
    fn test_ols_sequence() {
        let mut ls = LinearSupport::new(2, None);
        let mut r = rng();

        let w0 = ls.next_weight(WeightSelection::Ols, None, 1, &mut r).unwrap();
        assert!(ls.add_solution(vec![1.0, 0.0], w0).unwrap().is_empty());

        let w1 = ls.next_weight(WeightSelection::Ols, None, 1, &mut r).unwrap();
        assert_eq!(w1, vec![0.0, 1.0]);
        assert!(ls.add_solution(vec![0.0, 1.0], w1).unwrap().is_empty());

        // The two lines cross at [0.5, 0.5] with optimistic bound 1 vs 0.5.
        let w2 = ls.next_weight(WeightSelection::Ols, None, 1, &mut r).unwrap();
        assert!(close(&w2, &[0.5, 0.5]));
        assert!((ls.ols_priority(&w2) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dominated_value_rejected() {
        let mut ls = LinearSupport::new(2, None);
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        ls.add_solution(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let removed = ls.add_solution(vec![0.4, 0.4], vec![0.5, 0.5]).unwrap();
        assert_eq!(removed, vec![2]);
        assert_eq!(ls.ccs().len(), 2);
        assert_eq!(ls.visited_weights().len(), 3);
    }

    #[test]
    fn test_duplicate_value_rejected() {
        let mut ls = LinearSupport::new(2, None);
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        let removed = ls.add_solution(vec![1.0, 0.0], vec![0.0, 1.0]).unwrap();
        assert_eq!(removed, vec![1]);
        assert_eq!(ls.ccs().len(), 1);
    }

    #[test]
    fn test_new_value_obsoletes_old() {
        let mut ls = LinearSupport::new(2, None);
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        ls.add_solution(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let removed = ls.add_solution(vec![2.0, 2.0], vec![0.5, 0.5]).unwrap();
        assert_eq!(removed, vec![1, 0]);
        assert_eq!(ls.ccs(), &[vec![2.0, 2.0]]);
        assert_eq!(ls.weight_support(), &[vec![0.5, 0.5]]);
    }

    #[test]
    fn test_interior_value_kept() {
        let mut ls = LinearSupport::new(2, None);
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        ls.add_solution(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        assert!(ls.add_solution(vec![0.8, 0.8], vec![0.5, 0.5]).unwrap().is_empty());
        assert_eq!(ls.ccs().len(), 3);

        let corners = ls.corner_weights();
        assert!(corners.iter().any(|w| close(w, &[0.8, 0.2])));
        assert!(corners.iter().any(|w| close(w, &[0.2, 0.8])));
        // Optimistic bound at [0.8, 0.2]: 0.6 * 1 + 0.4 * 0.8 = 0.92.
        assert!((ls.optimistic_value(&[0.8, 0.2]) - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_corner_weights_single_value() {
        let mut ls = LinearSupport::new(2, None);
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        let corners = ls.corner_weights();
        assert_eq!(corners.len(), 2);
        assert!(corners.iter().any(|w| close(w, &[1.0, 0.0])));
        assert!(corners.iter().any(|w| close(w, &[0.0, 1.0])));
    }

    #[test]
    fn test_corner_weights_three_objectives() {
        let mut ls = LinearSupport::new(3, None);
        ls.add_solution(vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]).unwrap();
        ls.add_solution(vec![0.0, 1.0, 0.0], vec![0.0, 1.0, 0.0]).unwrap();
        let corners = ls.corner_weights();
        // Both surfaces meet along w1 = w2; the interior ridge ends at
        // [0.5, 0.5, 0] and at the third extremum.
        assert!(corners.iter().any(|w| close(w, &[0.5, 0.5, 0.0])));
        assert!(corners.iter().any(|w| close(w, &[0.0, 0.0, 1.0])));
        for w in &corners {
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_epsilon_filters_small_priorities() {
        let mut ls = LinearSupport::new(2, Some(0.6));
        let mut r = rng();
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        ls.add_solution(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        // The only corner has priority 0.5 < 0.6: fall back to a random weight.
        let w = ls.next_weight(WeightSelection::Ols, None, 1, &mut r).unwrap();
        assert_eq!(w.len(), 2);
        assert!(ls.queue().is_empty());
    }

    #[test]
    fn test_random_strategy_rejected() {
        let mut ls = LinearSupport::new(2, None);
        assert!(ls
            .next_weight(WeightSelection::Random, None, 1, &mut rng())
            .is_err());
    }

    #[test]
    fn test_remove_solutions() {
        let mut ls = LinearSupport::new(2, None);
        ls.add_solution(vec![1.0, 0.0], vec![1.0, 0.0]).unwrap();
        ls.add_solution(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        ls.add_solution(vec![0.8, 0.8], vec![0.5, 0.5]).unwrap();
        ls.remove_solutions(&[2, 0]).unwrap();
        assert_eq!(ls.ccs(), &[vec![0.0, 1.0]]);
        assert_eq!(ls.weight_support(), &[vec![0.0, 1.0]]);
        assert!(matches!(
            ls.remove_solutions(&[1]),
            Err(MultiPolicyError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_dimension_checked() {
        let mut ls = LinearSupport::new(2, None);
        assert!(matches!(
            ls.add_solution(vec![1.0], vec![1.0, 0.0]),
            Err(MultiPolicyError::DimensionMismatch { .. })
        ));
    }

    /// Moves down once: always collects the 0.7 treasure in one step.
    struct Down;

    impl ActionSelector for Down {
        fn decide(&self, _state: &Observation, _weight: &[f64]) -> Result<usize> {
            Ok(1)
        }
    }

    #[test]
    fn test_gpi_ls_requires_probe() {
        let mut ls = LinearSupport::new(2, None);
        assert!(matches!(
            ls.next_weight(WeightSelection::GpiLs, None, 1, &mut rng()),
            Err(MultiPolicyError::InvalidState(_))
        ));
    }

    #[test]
    fn test_gpi_ls_priority_from_rollouts() {
        let mut ls = LinearSupport::new(2, None);
        let mut env = DeepSeaTreasure::new();
        let mut r = rng();

        let probe = GpiProbe {
            agent: &Down,
            env: &mut env,
            gamma: 0.9,
            horizon: 100,
        };
        let w0 = ls.next_weight(WeightSelection::GpiLs, Some(probe), 1, &mut r).unwrap();
        assert_eq!(w0, vec![1.0, 0.0]);
        ls.add_solution(vec![0.0, -5.0], w0).unwrap();

        // At [0, 1] the probe reaches -1 against the CCS's -5.
        let probe = GpiProbe {
            agent: &Down,
            env: &mut env,
            gamma: 0.9,
            horizon: 100,
        };
        let w1 = ls.next_weight(WeightSelection::GpiLs, Some(probe), 1, &mut r).unwrap();
        assert!(close(&w1, &[0.0, 1.0]));
    }
}

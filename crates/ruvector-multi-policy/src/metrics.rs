//! Quality indicators for an approximate Pareto front.
//!
//! All objectives are maximized. Indicators that compare against a known
//! optimal front (IGD, maximum utility loss) are only computed when one is
//! supplied.

use crate::error::{ensure_dim, Result};
use crate::weights::dot;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Indicators for one front snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMetrics {
    /// Volume dominated by the front and bounded by the reference point.
    pub hypervolume: f64,
    /// Mean squared gap between neighbouring points, per objective.
    pub sparsity: f64,
    /// Number of non-dominated points.
    pub cardinality: usize,
    /// Mean over evaluation weights of the best scalarized value.
    pub expected_utility: f64,
    /// Inverted generational distance to the known front.
    pub igd: Option<f64>,
    /// Worst scalarized shortfall against the known front.
    pub maximum_utility_loss: Option<f64>,
}

/// `a` dominates `b`: at least as good everywhere, strictly better somewhere.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| x >= y)
        && a.iter().zip(b).any(|(x, y)| x > y)
}

/// Non-dominated subset of `points`, duplicates removed, input order kept.
pub fn filter_pareto_dominated(points: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut front: Vec<Vec<f64>> = Vec::new();
    for (i, p) in points.iter().enumerate() {
        if points.iter().enumerate().any(|(j, q)| j != i && dominates(q, p)) {
            continue;
        }
        if !front.contains(p) {
            front.push(p.clone());
        }
    }
    front
}

/// Exact hypervolume of `points` with respect to `reference`.
///
/// Points that do not strictly dominate the reference on every objective
/// contribute nothing.
pub fn hypervolume(reference: &[f64], points: &[Vec<f64>]) -> Result<f64> {
    for p in points {
        ensure_dim("hypervolume point", reference.len(), p.len())?;
    }
    let useful: Vec<Vec<f64>> = points
        .iter()
        .filter(|p| p.iter().zip(reference).all(|(x, r)| x > r))
        .cloned()
        .collect();
    Ok(hv_recursive(reference, useful))
}

fn hv_recursive(reference: &[f64], mut points: Vec<Vec<f64>>) -> f64 {
    let dim = reference.len();
    if points.is_empty() || dim == 0 {
        return 0.0;
    }
    match dim {
        1 => points
            .iter()
            .map(|p| p[0] - reference[0])
            .fold(0.0, f64::max),
        2 => hv_2d(reference, points),
        _ => {
            // Slice along the last objective, highest first.
            let last = dim - 1;
            points.sort_by(|a, b| b[last].partial_cmp(&a[last]).unwrap_or(Ordering::Equal));
            let mut volume = 0.0;
            for i in 0..points.len() {
                let lower = points.get(i + 1).map_or(reference[last], |p| p[last]);
                let depth = points[i][last] - lower;
                if depth <= 0.0 {
                    continue;
                }
                let slab: Vec<Vec<f64>> = points[..=i].iter().map(|p| p[..last].to_vec()).collect();
                volume += depth * hv_recursive(&reference[..last], slab);
            }
            volume
        }
    }
}

/// Sweep line over points sorted by the first objective, descending.
fn hv_2d(reference: &[f64], mut points: Vec<Vec<f64>>) -> f64 {
    points.sort_by(|a, b| b[0].partial_cmp(&a[0]).unwrap_or(Ordering::Equal));
    let mut volume = 0.0;
    let mut covered_y = reference[1];
    for p in &points {
        if p[1] > covered_y {
            volume += (p[0] - reference[0]) * (p[1] - covered_y);
            covered_y = p[1];
        }
    }
    volume
}

/// Sparsity of a front: for each objective, sort the values and sum the
/// squared gaps; total divided by `len - 1`. Zero below two points.
pub fn sparsity(front: &[Vec<f64>]) -> f64 {
    if front.len() < 2 {
        return 0.0;
    }
    let dim = front[0].len();
    let mut total = 0.0;
    for j in 0..dim {
        let mut column: Vec<f64> = front.iter().map(|p| p[j]).collect();
        column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        total += column.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>();
    }
    total / (front.len() - 1) as f64
}

/// Mean over `weights` of the best scalarized value in `front`.
pub fn expected_utility(front: &[Vec<f64>], weights: &[Vec<f64>]) -> f64 {
    if front.is_empty() || weights.is_empty() {
        return 0.0;
    }
    let total: f64 = weights.iter().map(|w| best_utility(front, w)).sum();
    total / weights.len() as f64
}

/// Inverted generational distance: mean distance from each known point to
/// its nearest neighbour in `front`.
///
/// `None` when `front` is empty; the distance is undefined there.
pub fn igd(known_front: &[Vec<f64>], front: &[Vec<f64>]) -> Option<f64> {
    if front.is_empty() {
        return None;
    }
    if known_front.is_empty() {
        return Some(0.0);
    }
    let total: f64 = known_front
        .iter()
        .map(|k| {
            front
                .iter()
                .map(|p| euclidean(k, p))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    Some(total / known_front.len() as f64)
}

/// Largest gap over `weights` between the best scalarized value of the
/// known front and that of `front`.
///
/// `None` when `front` is empty.
pub fn maximum_utility_loss(
    front: &[Vec<f64>],
    known_front: &[Vec<f64>],
    weights: &[Vec<f64>],
) -> Option<f64> {
    if front.is_empty() {
        return None;
    }
    let loss = weights
        .iter()
        .map(|w| best_utility(known_front, w) - best_utility(front, w))
        .fold(f64::NEG_INFINITY, f64::max)
        .max(0.0);
    Some(loss)
}

fn best_utility(front: &[Vec<f64>], weight: &[f64]) -> f64 {
    front
        .iter()
        .map(|v| dot(weight, v))
        .fold(f64::NEG_INFINITY, f64::max)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

impl FrontMetrics {
    /// Compute every indicator for `front`.
    ///
    /// The front is filtered to its non-dominated points first.
    pub fn compute(
        front: &[Vec<f64>],
        reference_point: &[f64],
        eval_weights: &[Vec<f64>],
        known_front: Option<&[Vec<f64>]>,
    ) -> Result<Self> {
        let dim = reference_point.len();
        for p in front {
            ensure_dim("front point", dim, p.len())?;
        }
        for w in eval_weights {
            ensure_dim("evaluation weight", dim, w.len())?;
        }
        if let Some(known) = known_front {
            for p in known {
                ensure_dim("known front point", dim, p.len())?;
            }
        }

        let filtered = filter_pareto_dominated(front);
        Ok(Self {
            hypervolume: hypervolume(reference_point, &filtered)?,
            sparsity: sparsity(&filtered),
            cardinality: filtered.len(),
            expected_utility: expected_utility(&filtered, eval_weights),
            igd: known_front.and_then(|known| igd(known, &filtered)),
            maximum_utility_loss: known_front
                .and_then(|known| maximum_utility_loss(&filtered, known, eval_weights)),
        })
    }
}

//! Weight-vector utilities.
//!
//! Weights live on (or near) the probability simplex: `k` non-negative
//! coefficients that linearly scalarize a `k`-objective value or reward.

use rand::Rng;
use rand_distr::{Distribution, Exp1};

/// Linear scalarization `w · v`.
///
/// Callers are expected to have checked lengths; extra components on either
/// side are ignored.
#[inline]
pub fn dot(weight: &[f64], value: &[f64]) -> f64 {
    weight.iter().zip(value.iter()).map(|(w, v)| w * v).sum()
}

/// Index of the first maximum. `None` for an empty slice.
///
/// Uses strict `>` so the earliest of several equal maxima wins. NaN never
/// replaces a finite maximum.
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            None => best = Some((i, v)),
            Some((_, b)) if v > b || (b.is_nan() && !v.is_nan()) => best = Some((i, v)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// Sample a weight uniformly from the `dim`-simplex (Dirichlet(1, ..., 1)).
pub fn random_weights(dim: usize, rng: &mut impl Rng) -> Vec<f64> {
    if dim == 0 {
        return Vec::new();
    }
    // Normalized Exp(1) draws are Dirichlet(1).
    let raw: Vec<f64> = (0..dim)
        .map(|_| Distribution::<f64>::sample(&Exp1, &mut *rng))
        .collect();
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return vec![1.0 / dim as f64; dim];
    }
    raw.into_iter().map(|x| x / total).collect()
}

/// The `dim` unit vectors, in objective order.
pub fn extrema_weights(dim: usize) -> Vec<Vec<f64>> {
    (0..dim)
        .map(|i| {
            let mut w = vec![0.0; dim];
            w[i] = 1.0;
            w
        })
        .collect()
}

/// A deterministic, evenly spread set of simplex weights (Das–Dennis lattice).
///
/// Picks the finest lattice with at most `n` points, but never fewer than the
/// `dim` extrema. For two objectives this is exactly `n` evenly spaced
/// weights from `[0, 1]` to `[1, 0]`.
pub fn equally_spaced_weights(dim: usize, n: usize) -> Vec<Vec<f64>> {
    if dim == 0 {
        return Vec::new();
    }
    if dim == 1 {
        return vec![vec![1.0]];
    }
    let mut partitions = 1usize;
    while lattice_size(dim, partitions + 1) <= n {
        partitions += 1;
    }

    let mut out = Vec::with_capacity(lattice_size(dim, partitions));
    let mut current = Vec::with_capacity(dim);
    compositions(dim, partitions, partitions, &mut current, &mut out);
    out
}

/// Number of points in the Das–Dennis lattice: C(h + dim - 1, dim - 1).
fn lattice_size(dim: usize, h: usize) -> usize {
    let k = dim - 1;
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (h + k - i) as u128 / (i + 1) as u128;
    }
    acc.min(usize::MAX as u128) as usize
}

fn compositions(
    dim: usize,
    remaining: usize,
    total: usize,
    current: &mut Vec<f64>,
    out: &mut Vec<Vec<f64>>,
) {
    if current.len() + 1 == dim {
        current.push(remaining as f64 / total as f64);
        out.push(current.clone());
        current.pop();
        return;
    }
    for part in 0..=remaining {
        current.push(part as f64 / total as f64);
        compositions(dim, remaining - part, total, current, out);
        current.pop();
    }
}

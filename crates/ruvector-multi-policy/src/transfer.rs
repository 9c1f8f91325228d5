//! Q-table transfer between pool members.
//!
//! A new policy trained for weight `w` starts from a copy of the Q-table of
//! the existing member whose frontier value projects highest on `w`. The copy
//! is deep: later updates to either table never reach the other.

use crate::error::{ensure_dim, Result};
use crate::policy::{QTable, SubPolicy};
use crate::weights::{argmax_first, dot};
use tracing::debug;

/// Index of the frontier value with the highest projection on `weight`.
///
/// The earliest index wins on ties. `None` for an empty frontier.
pub fn best_projection(values: &[Vec<f64>], weight: &[f64]) -> Result<Option<usize>> {
    for value in values {
        ensure_dim("frontier value", weight.len(), value.len())?;
    }
    let scores: Vec<f64> = values.iter().map(|v| dot(weight, v)).collect();
    Ok(argmax_first(&scores))
}

/// Deep copy of the Q-table of the best-projecting source.
///
/// `sources` and `values` are aligned by index.
pub fn transfer_source<'a, P>(
    sources: impl IntoIterator<Item = &'a P>,
    values: &[Vec<f64>],
    weight: &[f64],
) -> Result<Option<QTable>>
where
    P: SubPolicy + ?Sized + 'a,
{
    let Some(index) = best_projection(values, weight)? else {
        return Ok(None);
    };
    let table = sources.into_iter().nth(index).map(|source| {
        debug!(source = source.id(), index, "transferring q-table");
        source.q_table().clone()
    });
    Ok(table)
}

/// Overwrite `target`'s Q-table with a deep copy from the best source.
///
/// Returns whether a transfer happened.
pub fn warm_start<'a, P, T>(
    target: &mut T,
    sources: impl IntoIterator<Item = &'a P>,
    values: &[Vec<f64>],
) -> Result<bool>
where
    P: SubPolicy + ?Sized + 'a,
    T: SubPolicy + ?Sized,
{
    let weight = target.weight().to_vec();
    match transfer_source(sources, values, &weight)? {
        Some(table) => {
            target.set_q_table(table);
            Ok(true)
        }
        None => Ok(false),
    }
}

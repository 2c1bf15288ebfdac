//! Subsetting, mean collapse and clipping.
//!
//! - [`subset`]: restrict the Trial and/or Electrode axis by predicate.
//!   The two predicates are independent, so applying them together or one
//!   after the other in either order gives the same array.
//! - [`collapse`]: arithmetic mean over every axis not listed in `keep`,
//!   with the output dims in `keep` order.
//! - [`clip`]: clamp into `[low, high]` with the lower bound tested by `<`
//!   and the upper bound by `>=`.
use std::collections::BTreeSet;

use ndarray::{Array, ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::axis::{Dim, TfArray, TrialId};
use crate::error::{Result, TfError};

/// Treatment of NaN samples inside a [`collapse`] group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NanPolicy {
    /// Plain `sum / count`; any NaN in a group makes its mean NaN.
    #[default]
    Propagate,
    /// Ignore NaN samples; a group with no other samples yields NaN.
    Skip,
}

fn trial_matches(array: &TfArray, pred: &dyn Fn(TrialId) -> bool) -> Result<Vec<usize>> {
    let ids = array
        .axis(Dim::Trial)?
        .as_trials()
        .ok_or_else(|| TfError::ShapeMismatch("Trial axis has no trial ids".into()))?;
    let idx: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter(|(_, &id)| pred(id))
        .map(|(i, _)| i)
        .collect();
    if idx.is_empty() {
        return Err(TfError::EmptySelection(Dim::Trial));
    }
    Ok(idx)
}

fn electrode_matches(array: &TfArray, pred: &dyn Fn(&str) -> bool) -> Result<Vec<usize>> {
    let names = array
        .axis(Dim::Electrode)?
        .as_names()
        .ok_or_else(|| TfError::ShapeMismatch("Electrode axis has no names".into()))?;
    let idx: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| pred(n.as_str()))
        .map(|(i, _)| i)
        .collect();
    if idx.is_empty() {
        return Err(TfError::EmptySelection(Dim::Electrode));
    }
    Ok(idx)
}

/// New array holding only the trials and electrodes accepted by the
/// predicates.  A `None` predicate keeps its axis whole.
///
/// Fails with [`TfError::EmptySelection`] when a predicate accepts nothing.
pub fn subset(
    array: &TfArray,
    trial_pred: Option<&dyn Fn(TrialId) -> bool>,
    electrode_pred: Option<&dyn Fn(&str) -> bool>,
) -> Result<TfArray> {
    // Resolve both selections before allocating anything.
    let trials = trial_pred.map(|p| trial_matches(array, p)).transpose()?;
    let electrodes = electrode_pred.map(|p| electrode_matches(array, p)).transpose()?;

    let out = match trials {
        Some(idx) => array.select(Dim::Trial, &idx)?,
        None => array.clone(),
    };
    match electrodes {
        Some(idx) => out.select(Dim::Electrode, &idx),
        None => Ok(out),
    }
}

/// Keep the trials whose id is in `trials`.
pub fn subset_trials(array: &TfArray, trials: &BTreeSet<TrialId>) -> Result<TfArray> {
    subset(array, Some(&|id: TrialId| trials.contains(&id)), None)
}

/// Keep the named electrodes (axis order is preserved, not `names` order).
pub fn subset_electrodes<S: AsRef<str>>(array: &TfArray, names: &[S]) -> Result<TfArray> {
    subset(array, None, Some(&|n: &str| names.iter().any(|x| x.as_ref() == n)))
}

/// Mean over every axis not in `keep`; output dims follow `keep` order.
///
/// `keep = []` reduces to a 0-d array holding the grand mean.
pub fn collapse(array: &TfArray, keep: &[Dim], nan: NanPolicy) -> Result<TfArray> {
    let mut order = Vec::with_capacity(array.ndim());
    for (i, &d) in keep.iter().enumerate() {
        if keep[..i].contains(&d) {
            return Err(TfError::ShapeMismatch(format!("{d} listed twice in keep")));
        }
        order.push(array.axis_index(d)?);
    }
    let mut group = 1usize;
    for (k, ax) in array.axes().iter().enumerate() {
        if order.contains(&k) {
            continue;
        }
        if ax.is_empty() {
            return Err(TfError::EmptySelection(ax.dim()));
        }
        group *= ax.len();
        order.push(k);
    }

    // Kept axes lead, reduced axes trail: every run of `group` consecutive
    // elements in logical order is one output cell.
    let permuted = array.data().view().permuted_axes(IxDyn(&order));
    let flat: Vec<f64> = permuted.iter().copied().collect();
    let means: Vec<f64> = flat.chunks_exact(group).map(|g| mean(g, nan)).collect();

    let out_shape: Vec<usize> = order[..keep.len()].iter().map(|&k| array.shape()[k]).collect();
    let data = ArrayD::from_shape_vec(IxDyn(&out_shape), means)
        .map_err(|e| TfError::ShapeMismatch(e.to_string()))?;
    let axes = order[..keep.len()].iter().map(|&k| array.axes()[k].clone()).collect();
    TfArray::new(data, axes)
}

fn mean(group: &[f64], nan: NanPolicy) -> f64 {
    match nan {
        NanPolicy::Propagate => group.iter().sum::<f64>() / group.len() as f64,
        NanPolicy::Skip => {
            let (sum, n) = group
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
            if n == 0 {
                f64::NAN
            } else {
                sum / n as f64
            }
        }
    }
}

/// Clamp one value: `< low` → `low`, `>= high` → `high`.  NaN passes through.
#[inline]
pub fn clip_value(v: f64, low: f64, high: f64) -> f64 {
    if v < low {
        low
    } else if v >= high {
        high
    } else {
        v
    }
}

/// Element-wise [`clip_value`] into a new array of the same shape.
pub fn clip<S, D>(array: &ArrayBase<S, D>, low: f64, high: f64) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    array.mapv(|v| clip_value(v, low, high))
}

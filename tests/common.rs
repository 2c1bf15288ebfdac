/// Shared synthetic builders for the integration tests.
use ndarray::Array4;
use std::path::PathBuf;
use tfpower::{TfArray, TrialIndex};

#[allow(unused)]
/// Canonical array with `power[f, t, r, e] = fill(f, t, r, e)`.
pub fn synthetic<F>(shape: (usize, usize, usize, usize), fill: F) -> TfArray
where
    F: Fn(usize, usize, usize, usize) -> f64,
{
    let (n_f, n_t, n_r, n_e) = shape;
    let data = Array4::from_shape_fn(shape, |(f, t, r, e)| fill(f, t, r, e));
    TfArray::from_canonical(
        data,
        (0..n_f).map(|f| 4.0 * (f + 1) as f64).collect(),
        (0..n_t).map(|t| -0.2 + 0.1 * t as f64).collect(),
        (1..=n_r as u32).collect(),
        (0..n_e).map(|e| format!("E{}", e + 1)).collect(),
    )
    .unwrap()
}

#[allow(unused)]
/// Deterministic pseudo-random positive power.
pub fn noisy(shape: (usize, usize, usize, usize)) -> TfArray {
    synthetic(shape, |f, t, r, e| {
        1.5 + ((f * 7 + t * 13 + r * 17 + e * 29) as f64 * 0.37).sin()
    })
}

#[allow(unused)]
/// Trials 1..=n alternating between conditions "a" and "b".
pub fn alternating_index(n: u32) -> TrialIndex {
    TrialIndex::from_conditions((1..=n).map(|id| (id, if id % 2 == 1 { "a" } else { "b" })))
        .unwrap()
}

#[allow(unused)]
/// Unique path in the system temp directory.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tfpower-{}-{name}", std::process::id()))
}

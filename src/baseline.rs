//! Baseline normalisation of power spectrograms.
//!
//! For each (frequency, electrode) pair a reference statistic is taken over the
//! Time samples inside a [`BaselineWindow`] and over trials (pooled or per
//! trial, see [`BaselineScope`]), then every sample is rescaled against it:
//!
//! ```text
//! decibel   10 · log10(x / ref)
//! ratio     x / ref
//! percent   (x − ref) / ref · 100
//! mean      x − ref
//! zscore    (x − ref) / sd        (sd over the same reference samples, ddof = 0)
//! ```
//!
//! The raw array is never modified; the result is a new [`TfArray`] with the
//! same axes.
use std::fmt;
use std::str::FromStr;

use ndarray::{Array4, Ix4};

use crate::axis::{in_time_window, Dim, TfArray};
use crate::error::{Result, TfError};

/// Closed reference interval `[lo, hi]` on the Time axis, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineWindow {
    pub lo: f64,
    pub hi: f64,
}

impl BaselineWindow {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    fn invalid(&self, reason: impl Into<String>) -> TfError {
        TfError::InvalidWindow { lo: self.lo, hi: self.hi, reason: reason.into() }
    }

    /// Indices of the `times` labels falling inside the window (edges
    /// matched within 1e-9 s).
    ///
    /// Fails when the bounds are not finite, inverted, or select nothing.
    pub fn indices(&self, times: &[f64]) -> Result<Vec<usize>> {
        if !self.lo.is_finite() || !self.hi.is_finite() {
            return Err(self.invalid("bounds must be finite"));
        }
        if self.lo > self.hi {
            return Err(self.invalid("lower bound exceeds upper bound"));
        }
        let idx: Vec<usize> = times
            .iter()
            .enumerate()
            .filter(|(_, &t)| in_time_window(t, self.lo, self.hi))
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            return Err(self.invalid("no time sample falls inside the window"));
        }
        if let (Some(&first), Some(&last)) = (times.first(), times.last()) {
            if self.lo < first || self.hi > last {
                log::debug!(
                    "baseline window [{}, {}] extends past time range [{first}, {last}]; using {} samples",
                    self.lo,
                    self.hi,
                    idx.len()
                );
            }
        }
        Ok(idx)
    }
}

/// Rescaling applied against the reference statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaselineMethod {
    #[default]
    Decibel,
    Ratio,
    Percent,
    Mean,
    ZScore,
}

impl BaselineMethod {
    #[inline]
    fn rescale(self, x: f64, reference: &RefStats) -> f64 {
        let m = reference.mean;
        match self {
            BaselineMethod::Decibel => 10.0 * (x / m).log10(),
            BaselineMethod::Ratio => x / m,
            BaselineMethod::Percent => (x - m) / m * 100.0,
            BaselineMethod::Mean => x - m,
            BaselineMethod::ZScore => (x - m) / reference.sd,
        }
    }
}

impl fmt::Display for BaselineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BaselineMethod::Decibel => "decibel",
            BaselineMethod::Ratio => "ratio",
            BaselineMethod::Percent => "percent",
            BaselineMethod::Mean => "mean",
            BaselineMethod::ZScore => "zscore",
        })
    }
}

impl FromStr for BaselineMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decibel" | "db" => Ok(BaselineMethod::Decibel),
            "ratio" => Ok(BaselineMethod::Ratio),
            "percent" => Ok(BaselineMethod::Percent),
            "mean" => Ok(BaselineMethod::Mean),
            "zscore" => Ok(BaselineMethod::ZScore),
            other => Err(format!("unknown baseline method {other:?}")),
        }
    }
}

/// Which samples a reference statistic pools over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaselineScope {
    /// One reference per (frequency, electrode), over window times × all trials.
    #[default]
    Pooled,
    /// One reference per (frequency, trial, electrode), over window times only.
    PerTrial,
}

/// Mean and population standard deviation of the reference samples.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RefStats {
    mean: f64,
    sd: f64,
}

impl RefStats {
    fn of(samples: &[f64]) -> Self {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Self { mean, sd: var.sqrt() }
    }
}

/// Baseline-normalise a canonical `[F, T, Tr, E]` array.
///
/// Returns a new array; `raw` is left untouched.  Re-running on the same input
/// gives bit-identical output.
pub fn apply_baseline(
    raw: &TfArray,
    window: BaselineWindow,
    method: BaselineMethod,
    scope: BaselineScope,
) -> Result<TfArray> {
    if !raw.is_canonical() {
        return Err(TfError::ShapeMismatch(format!(
            "baseline needs [Frequency, Time, Trial, Electrode], got {:?}",
            raw.dims()
        )));
    }
    let times = raw
        .axis(Dim::Time)?
        .as_numeric()
        .ok_or_else(|| TfError::ShapeMismatch("Time axis is not numeric".into()))?;
    let ref_idx = window.indices(times)?;

    let power = raw
        .data()
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|e| TfError::ShapeMismatch(e.to_string()))?;
    let (n_f, n_t, n_r, n_e) = power.dim();
    let mut out = Array4::<f64>::zeros((n_f, n_t, n_r, n_e));
    let mut samples = Vec::with_capacity(ref_idx.len() * n_r);

    for f in 0..n_f {
        for e in 0..n_e {
            match scope {
                BaselineScope::Pooled => {
                    samples.clear();
                    for r in 0..n_r {
                        samples.extend(ref_idx.iter().map(|&t| power[[f, t, r, e]]));
                    }
                    let stats = RefStats::of(&samples);
                    for t in 0..n_t {
                        for r in 0..n_r {
                            out[[f, t, r, e]] = method.rescale(power[[f, t, r, e]], &stats);
                        }
                    }
                }
                BaselineScope::PerTrial => {
                    for r in 0..n_r {
                        samples.clear();
                        samples.extend(ref_idx.iter().map(|&t| power[[f, t, r, e]]));
                        let stats = RefStats::of(&samples);
                        for t in 0..n_t {
                            out[[f, t, r, e]] = method.rescale(power[[f, t, r, e]], &stats);
                        }
                    }
                }
            }
        }
    }

    log::debug!(
        "baseline {method} ({scope:?}) over {} time samples in [{}, {}]",
        ref_idx.len(),
        window.lo,
        window.hi
    );
    raw.with_data(out.into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn ramp() -> TfArray {
        // power[f, t, r, e] = 1 + f + t + r + e
        let data = Array4::from_shape_fn((2, 4, 3, 2), |(f, t, r, e)| (1 + f + t + r + e) as f64);
        TfArray::from_canonical(
            data,
            vec![10.0, 20.0],
            vec![-0.2, -0.1, 0.0, 0.1],
            vec![1, 2, 3],
            vec!["A1".into(), "A2".into()],
        )
        .unwrap()
    }

    #[test]
    fn window_selects_closed_interval() {
        let w = BaselineWindow::new(-0.1, 0.0);
        assert_eq!(w.indices(&[-0.2, -0.1, 0.0, 0.1]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn window_outside_time_axis_rejected() {
        let w = BaselineWindow::new(1.0, 2.0);
        assert!(matches!(w.indices(&[0.0, 0.5]), Err(TfError::InvalidWindow { .. })));
        let w = BaselineWindow::new(0.5, 0.0);
        assert!(matches!(w.indices(&[0.0, 0.5]), Err(TfError::InvalidWindow { .. })));
        let w = BaselineWindow::new(f64::NAN, 0.0);
        assert!(matches!(w.indices(&[0.0, 0.5]), Err(TfError::InvalidWindow { .. })));
    }

    #[test]
    fn window_edges_match_float_stepped_times() {
        // -0.5 + 40 * 0.01 lands just above -0.1
        let times: Vec<f64> = (0..=150).map(|i| -0.5 + i as f64 * 0.01).collect();
        let idx = BaselineWindow::new(-0.5, -0.1).indices(&times).unwrap();
        assert_eq!(idx.len(), 41);
        assert_eq!(idx.first(), Some(&0));
        assert_eq!(idx.last(), Some(&40));
    }

    #[test]
    fn partial_overlap_accepted() {
        let w = BaselineWindow::new(-5.0, -0.15);
        assert_eq!(w.indices(&[-0.2, -0.1, 0.0, 0.1]).unwrap(), vec![0]);
    }

    #[test]
    fn mean_method_subtracts_pooled_reference() {
        let a = ramp();
        let w = BaselineWindow::new(-0.2, -0.2);
        let out = apply_baseline(&a, w, BaselineMethod::Mean, BaselineScope::Pooled).unwrap();
        // reference(f, e) = mean over r of (1 + f + 0 + r + e) = 2 + f + e
        let x = out.data()[[1, 3, 2, 1]];
        approx::assert_abs_diff_eq!(x, (1.0 + 1.0 + 3.0 + 2.0 + 1.0) - (2.0 + 1.0 + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn per_trial_reference_zeroes_window() {
        let a = ramp();
        let w = BaselineWindow::new(-0.2, -0.2);
        let out = apply_baseline(&a, w, BaselineMethod::Mean, BaselineScope::PerTrial).unwrap();
        for f in 0..2 {
            for r in 0..3 {
                for e in 0..2 {
                    approx::assert_abs_diff_eq!(out.data()[[f, 0, r, e]], 0.0, epsilon = 1e-12);
                    approx::assert_abs_diff_eq!(out.data()[[f, 3, r, e]], 3.0, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn zscore_uses_population_sd() {
        let a = ramp();
        let w = BaselineWindow::new(-0.2, -0.2);
        let out = apply_baseline(&a, w, BaselineMethod::ZScore, BaselineScope::Pooled).unwrap();
        // window samples over r for (f=0, e=0): 1, 2, 3 → mean 2, sd sqrt(2/3)
        let sd = (2.0_f64 / 3.0).sqrt();
        approx::assert_abs_diff_eq!(out.data()[[0, 1, 0, 0]], (2.0 - 2.0) / sd, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(out.data()[[0, 2, 2, 0]], (5.0 - 2.0) / sd, epsilon = 1e-12);
    }

    #[test]
    fn ratio_and_percent_agree() {
        let a = ramp();
        let w = BaselineWindow::new(-0.2, 0.1);
        let ratio = apply_baseline(&a, w, BaselineMethod::Ratio, BaselineScope::Pooled).unwrap();
        let pct = apply_baseline(&a, w, BaselineMethod::Percent, BaselineScope::Pooled).unwrap();
        for (r, p) in ratio.data().iter().zip(pct.data().iter()) {
            approx::assert_abs_diff_eq!((r - 1.0) * 100.0, *p, epsilon = 1e-9);
        }
    }

    #[test]
    fn raw_is_not_modified() {
        let a = ramp();
        let before = a.clone();
        let _ = apply_baseline(&a, BaselineWindow::new(-0.2, 0.0), BaselineMethod::Decibel, BaselineScope::Pooled)
            .unwrap();
        assert_eq!(a, before);
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("dB".parse::<BaselineMethod>().unwrap(), BaselineMethod::Decibel);
        assert_eq!("zscore".parse::<BaselineMethod>().unwrap(), BaselineMethod::ZScore);
        assert!("logratio".parse::<BaselineMethod>().is_err());
    }
}

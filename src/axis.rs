//! Labelled axes and the labelled N-D power array.
//!
//! A [`TfArray`] is an owned `ArrayD<f64>` paired with one [`Axis`] per
//! dimension.  The invariant `data.shape()[i] == axes[i].len()` is checked on
//! construction and preserved by every transformation, each of which returns a
//! fresh allocation.
//!
//! Canonical repository order is `[Frequency, Time, Trial, Electrode]`.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array4, ArrayD};

use crate::error::{Result, TfError};

/// Trial identifier as found in the `Trial` column of a trial table.
pub type TrialId = u32;

/// Slack allowed on the edges of a closed time interval, in seconds.
pub(crate) const TIME_TOL: f64 = 1e-9;

/// `lo <= t <= hi` within [`TIME_TOL`].  Time labels are usually built by
/// repeated float steps, so an exact test drops boundary samples.
#[inline]
pub(crate) fn in_time_window(t: f64, lo: f64, hi: f64) -> bool {
    t >= lo - TIME_TOL && t <= hi + TIME_TOL
}

/// The four named dimensions of a power spectrogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    Frequency,
    Time,
    Trial,
    Electrode,
}

impl Dim {
    /// Repository storage order.
    pub const CANONICAL: [Dim; 4] = [Dim::Frequency, Dim::Time, Dim::Trial, Dim::Electrode];

    pub fn name(self) -> &'static str {
        match self {
            Dim::Frequency => "Frequency",
            Dim::Time => "Time",
            Dim::Trial => "Trial",
            Dim::Electrode => "Electrode",
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dim {
    type Err = String;

    /// Case-insensitive; accepts the short forms `freq` and `elec` too.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frequency" | "freq" => Ok(Dim::Frequency),
            "time" => Ok(Dim::Time),
            "trial" => Ok(Dim::Trial),
            "electrode" | "elec" => Ok(Dim::Electrode),
            other => Err(format!("unknown axis name {other:?}")),
        }
    }
}

/// Ordered labels of one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    /// Frequencies in Hz or times in seconds.
    Numeric(Vec<f64>),
    Trials(Vec<TrialId>),
    /// Electrode names.
    Names(Vec<String>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Numeric(v) => v.len(),
            Labels::Trials(v) => v.len(),
            Labels::Names(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, idx: &[usize]) -> Labels {
        match self {
            Labels::Numeric(v) => Labels::Numeric(idx.iter().map(|&i| v[i]).collect()),
            Labels::Trials(v) => Labels::Trials(idx.iter().map(|&i| v[i]).collect()),
            Labels::Names(v) => Labels::Names(idx.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// A named axis with its ordered labels.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    dim: Dim,
    labels: Labels,
}

impl Axis {
    pub fn frequency(hz: Vec<f64>) -> Self {
        Self { dim: Dim::Frequency, labels: Labels::Numeric(hz) }
    }

    pub fn time(seconds: Vec<f64>) -> Self {
        Self { dim: Dim::Time, labels: Labels::Numeric(seconds) }
    }

    pub fn trial(ids: Vec<TrialId>) -> Self {
        Self { dim: Dim::Trial, labels: Labels::Trials(ids) }
    }

    pub fn electrode(names: Vec<String>) -> Self {
        Self { dim: Dim::Electrode, labels: Labels::Names(names) }
    }

    #[inline]
    pub fn dim(&self) -> Dim {
        self.dim
    }

    #[inline]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Numeric labels (Frequency, Time).
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.labels {
            Labels::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_trials(&self) -> Option<&[TrialId]> {
        match &self.labels {
            Labels::Trials(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_names(&self) -> Option<&[String]> {
        match &self.labels {
            Labels::Names(v) => Some(v),
            _ => None,
        }
    }

    /// New axis holding the labels at `idx`, in that order.
    pub fn select(&self, idx: &[usize]) -> Axis {
        Axis { dim: self.dim, labels: self.labels.select(idx) }
    }
}

/// Trial ids and electrode names identify one entry each.
fn check_unique(axis: &Axis) -> Result<()> {
    match axis.labels() {
        Labels::Trials(ids) => {
            let mut seen = BTreeSet::new();
            if let Some(&id) = ids.iter().find(|&&id| !seen.insert(id)) {
                return Err(TfError::DuplicateTrial(id));
            }
        }
        Labels::Names(names) => {
            let mut seen = BTreeSet::new();
            if let Some(n) = names.iter().find(|&n| !seen.insert(n)) {
                return Err(TfError::ShapeMismatch(format!("{} {n:?} appears twice", axis.dim())));
            }
        }
        Labels::Numeric(_) => {}
    }
    Ok(())
}

/// Owned N-D power values with one labelled axis per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct TfArray {
    data: ArrayD<f64>,
    axes: Vec<Axis>,
}

impl TfArray {
    /// Pair `data` with `axes`, checking shape agreement and dim uniqueness.
    pub fn new(data: ArrayD<f64>, axes: Vec<Axis>) -> Result<Self> {
        if data.ndim() != axes.len() {
            return Err(TfError::ShapeMismatch(format!(
                "array has {} dims but {} axes were given",
                data.ndim(),
                axes.len()
            )));
        }
        for (i, (ax, &n)) in axes.iter().zip(data.shape()).enumerate() {
            if ax.len() != n {
                return Err(TfError::ShapeMismatch(format!(
                    "dim {i} ({}) has length {n} but {} labels",
                    ax.dim(),
                    ax.len()
                )));
            }
            if axes[..i].iter().any(|a| a.dim() == ax.dim()) {
                return Err(TfError::ShapeMismatch(format!("axis {} given twice", ax.dim())));
            }
            check_unique(ax)?;
        }
        Ok(Self { data, axes })
    }

    /// Build a canonical `[Frequency, Time, Trial, Electrode]` array.
    pub fn from_canonical(
        data: Array4<f64>,
        freqs: Vec<f64>,
        times: Vec<f64>,
        trials: Vec<TrialId>,
        electrodes: Vec<String>,
    ) -> Result<Self> {
        Self::new(
            data.into_dyn(),
            vec![
                Axis::frequency(freqs),
                Axis::time(times),
                Axis::trial(trials),
                Axis::electrode(electrodes),
            ],
        )
    }

    #[inline]
    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    #[inline]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn dims(&self) -> Vec<Dim> {
        self.axes.iter().map(Axis::dim).collect()
    }

    /// `true` when the dims are exactly `[Frequency, Time, Trial, Electrode]`.
    pub fn is_canonical(&self) -> bool {
        self.dims() == Dim::CANONICAL
    }

    /// Position of `dim` among this array's dimensions.
    pub fn axis_index(&self, dim: Dim) -> Result<usize> {
        self.axes
            .iter()
            .position(|a| a.dim() == dim)
            .ok_or(TfError::MissingAxis(dim))
    }

    pub fn axis(&self, dim: Dim) -> Result<&Axis> {
        Ok(&self.axes[self.axis_index(dim)?])
    }

    /// Copy of this array restricted to the entries `idx` of axis `dim`.
    pub fn select(&self, dim: Dim, idx: &[usize]) -> Result<TfArray> {
        let k = self.axis_index(dim)?;
        let data = self.data.select(ndarray::Axis(k), idx);
        let mut axes = self.axes.clone();
        axes[k] = self.axes[k].select(idx);
        TfArray::new(data, axes)
    }

    /// Element-wise map onto a new array with the same axes.
    pub fn mapv(&self, f: impl Fn(f64) -> f64) -> TfArray {
        TfArray { data: self.data.mapv(f), axes: self.axes.clone() }
    }

    /// Replace the values, keeping the axes.  Shape must match.
    pub(crate) fn with_data(&self, data: ArrayD<f64>) -> Result<TfArray> {
        TfArray::new(data, self.axes.clone())
    }
}

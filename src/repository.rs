//! Spectrogram repository: the raw `[F, T, Tr, E]` power array, its axes, and
//! the single active baselined view.
//!
//! # Loading
//! A [`PowerSource`] hands back a fully materialised canonical array; the
//! repository then applies the [`LoadRequest`] to it:
//!
//! 1. Electrodes, in the requested order.  Any name the source lacks fails.
//! 2. Time samples inside the closed request window.  The window must lie
//!    within the available time range.
//! 3. Frequencies, in the requested order, matched within `1e-9` Hz.
//!
//! Every miss is [`TfError::DataUnavailable`].  Sources may pre-filter;
//! re-applying the same request to an already filtered array is a no-op.
use crate::axis::{in_time_window, Dim, TfArray, TrialId, TIME_TOL};
use crate::baseline::{self, BaselineMethod, BaselineScope, BaselineWindow};
use crate::error::{Result, TfError};

/// Frequency match tolerance in Hz.
const FREQ_TOL: f64 = 1e-9;

/// What to pull from a [`PowerSource`].  `None` fields mean "everything".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadRequest {
    pub electrodes: Option<Vec<String>>,
    /// Closed `(lo, hi)` window in seconds.
    pub time_window: Option<(f64, f64)>,
    /// Frequencies in Hz.
    pub frequencies: Option<Vec<f64>>,
}

/// External provider of time-frequency power.
///
/// Implementations return a canonical `[Frequency, Time, Trial, Electrode]`
/// array or [`TfError::DataUnavailable`].
pub trait PowerSource {
    fn fetch(&self, request: &LoadRequest) -> Result<TfArray>;
}

/// A source backed by an array already in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    power: TfArray,
}

impl InMemorySource {
    pub fn new(power: TfArray) -> Result<Self> {
        require_canonical(&power)?;
        Ok(Self { power })
    }
}

impl PowerSource for InMemorySource {
    fn fetch(&self, request: &LoadRequest) -> Result<TfArray> {
        apply_request(&self.power, request)
    }
}

fn require_canonical(array: &TfArray) -> Result<()> {
    if array.is_canonical() {
        Ok(())
    } else {
        Err(TfError::ShapeMismatch(format!(
            "expected [Frequency, Time, Trial, Electrode], got {:?}",
            array.dims()
        )))
    }
}

/// Restrict a canonical array to the electrodes, times and frequencies of
/// `request`.
pub fn apply_request(full: &TfArray, request: &LoadRequest) -> Result<TfArray> {
    require_canonical(full)?;
    let mut out = full.clone();

    if let Some(wanted) = &request.electrodes {
        if wanted.is_empty() {
            return Err(TfError::DataUnavailable("no electrodes requested".into()));
        }
        let names = out.axis(Dim::Electrode)?.as_names().unwrap_or(&[]);
        let idx = wanted
            .iter()
            .map(|w| {
                names
                    .iter()
                    .position(|n| n == w)
                    .ok_or_else(|| TfError::DataUnavailable(format!("electrode {w:?} not in source")))
            })
            .collect::<Result<Vec<_>>>()?;
        out = out.select(Dim::Electrode, &idx)?;
    }

    if let Some((lo, hi)) = request.time_window {
        let times = out.axis(Dim::Time)?.as_numeric().unwrap_or(&[]);
        let (first, last) = match (times.first(), times.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(TfError::DataUnavailable("source has no time samples".into())),
        };
        if !(lo <= hi) || lo < first - TIME_TOL || hi > last + TIME_TOL {
            return Err(TfError::DataUnavailable(format!(
                "time window [{lo}, {hi}] not within available [{first}, {last}]"
            )));
        }
        let idx: Vec<usize> = times
            .iter()
            .enumerate()
            .filter(|(_, &t)| in_time_window(t, lo, hi))
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            return Err(TfError::DataUnavailable(format!(
                "no time sample inside [{lo}, {hi}]"
            )));
        }
        out = out.select(Dim::Time, &idx)?;
    }

    if let Some(wanted) = &request.frequencies {
        if wanted.is_empty() {
            return Err(TfError::DataUnavailable("no frequencies requested".into()));
        }
        let freqs = out.axis(Dim::Frequency)?.as_numeric().unwrap_or(&[]);
        let idx = wanted
            .iter()
            .map(|&w| {
                freqs
                    .iter()
                    .position(|&f| (f - w).abs() <= FREQ_TOL)
                    .ok_or_else(|| TfError::DataUnavailable(format!("frequency {w} Hz not in source")))
            })
            .collect::<Result<Vec<_>>>()?;
        out = out.select(Dim::Frequency, &idx)?;
    }

    Ok(out)
}

/// Raw power plus at most one baselined view.
///
/// Raw values never change after construction.  [`apply_baseline`] replaces
/// the previous baselined view; keep separate repositories to hold several.
///
/// [`apply_baseline`]: SpectrogramRepository::apply_baseline
#[derive(Debug, Clone)]
pub struct SpectrogramRepository {
    raw: TfArray,
    baselined: Option<TfArray>,
}

impl SpectrogramRepository {
    /// Wrap an already-built canonical array.
    pub fn new(raw: TfArray) -> Result<Self> {
        require_canonical(&raw)?;
        Ok(Self { raw, baselined: None })
    }

    /// Fetch from `source` and restrict to `request`.
    pub fn load<P: PowerSource + ?Sized>(source: &P, request: &LoadRequest) -> Result<Self> {
        let fetched = source.fetch(request)?;
        let raw = apply_request(&fetched, request)?;
        log::debug!("loaded power {:?} (F × T × Tr × E)", raw.shape());
        Self::new(raw)
    }

    #[inline]
    pub fn raw(&self) -> &TfArray {
        &self.raw
    }

    /// The most recently computed baselined view, if any.
    #[inline]
    pub fn baselined(&self) -> Option<&TfArray> {
        self.baselined.as_ref()
    }

    /// `[F, T, Tr, E]`.
    pub fn shape(&self) -> &[usize] {
        self.raw.shape()
    }

    pub fn freqs(&self) -> &[f64] {
        self.raw.axes()[0].as_numeric().unwrap_or(&[])
    }

    pub fn times(&self) -> &[f64] {
        self.raw.axes()[1].as_numeric().unwrap_or(&[])
    }

    pub fn trials(&self) -> &[TrialId] {
        self.raw.axes()[2].as_trials().unwrap_or(&[])
    }

    pub fn electrodes(&self) -> &[String] {
        self.raw.axes()[3].as_names().unwrap_or(&[])
    }

    /// Compute a baselined view from the raw values and make it the active
    /// one, replacing any previous view.  On error the previous view stays.
    pub fn apply_baseline(
        &mut self,
        window: BaselineWindow,
        method: BaselineMethod,
        scope: BaselineScope,
    ) -> Result<&TfArray> {
        let view = baseline::apply_baseline(&self.raw, window, method, scope)?;
        Ok(self.baselined.insert(view))
    }

    pub fn clear_baseline(&mut self) {
        self.baselined = None;
    }
}

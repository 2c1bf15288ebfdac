//! # tfpower — time-frequency power pipeline for intracranial EEG
//!
//! `tfpower` takes precomputed time-frequency power (wavelet or otherwise),
//! baseline-normalises it, selects trials by experimental condition and
//! electrodes by name, averages over what is left and hands a clipped 2-D map
//! to whatever plots it.  Wavelet transforms, file-format parsing beyond the
//! simple safetensors layout in [`io`], and drawing stay outside.
//!
//! ## Pipeline overview
//!
//! ```text
//! power.safetensors  +  trials.csv
//!   │                      │
//!   ├─ SpectrogramRepository::load()   [F, T, Tr, E] raw power
//!   │                      └─ io::read_trial_table()  → TrialIndex
//!   ├─ apply_baseline                  10·log10(x / mean(x over window, trials))
//!   ├─ TrialIndex::trials_for          condition labels → trial ids
//!   ├─ select::subset                  trials ∧ electrodes
//!   ├─ select::collapse                mean over Trial, Electrode → [F, T]
//!   └─ render::Heatmap                 clip into zlim (< low, >= high)
//!        │
//!        └─→ Heatmap { [F, T] f64, rows = Frequency, cols = Time, zlim }
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use tfpower::{condition_spectrogram, LoadRequest, Session, SpectrogramRepository};
//! use tfpower::io::{read_trial_table, SafetensorsSource};
//! use std::path::Path;
//!
//! let source = SafetensorsSource::new("data/sub-01_power.safetensors");
//! let mut repo = SpectrogramRepository::load(&source, &LoadRequest::default()).unwrap();
//! let trials = read_trial_table(Path::new("data/sub-01_trials.csv")).unwrap();
//!
//! let session = Session::new("01");
//! let hm = condition_spectrogram(&mut repo, &trials, &session, &["face"], None).unwrap();
//! println!("heatmap {:?}, zlim {:?}", hm.data().dim(), hm.range());
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use tfpower::{Dim, NanPolicy, TfArray};
//! use tfpower::baseline::{apply_baseline, BaselineMethod, BaselineScope, BaselineWindow};
//! use tfpower::select::{clip, collapse, subset};
//! use ndarray::Array4;
//!
//! let power = TfArray::from_canonical(
//!     Array4::from_elem((3, 5, 4, 2), 2.0),
//!     vec![4.0, 8.0, 16.0],
//!     vec![-0.2, -0.1, 0.0, 0.1, 0.2],
//!     vec![1, 2, 3, 4],
//!     vec!["LA1".into(), "LA2".into()],
//! ).unwrap();
//!
//! let db = apply_baseline(
//!     &power,
//!     BaselineWindow::new(-0.2, -0.1),
//!     BaselineMethod::Decibel,
//!     BaselineScope::Pooled,
//! ).unwrap();
//! let odd = subset(&db, Some(&|id: u32| id % 2 == 1), None).unwrap();
//! let ft = collapse(&odd, &[Dim::Frequency, Dim::Time], NanPolicy::Propagate).unwrap();
//! let shown = clip(ft.data(), -13.0, 13.0);
//! assert_eq!(shown.shape(), &[3, 5]);
//! ```

pub mod axis;
pub mod baseline;
pub mod config;
pub mod error;
pub mod io;
pub mod render;
pub mod repository;
pub mod select;
pub mod trials;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// axis
pub use axis::{Axis, Dim, Labels, TfArray, TrialId};

// baseline
pub use baseline::{apply_baseline, BaselineMethod, BaselineScope, BaselineWindow};

// config
pub use config::{PipelineConfig, Session};

// error
pub use error::{Result, TfError};

// render
pub use render::{Heatmap, ValueRange};

// repository
pub use repository::{InMemorySource, LoadRequest, PowerSource, SpectrogramRepository};

// select
pub use select::{clip, clip_value, collapse, subset, subset_electrodes, subset_trials, NanPolicy};

// trials
pub use trials::{Strictness, TrialIndex, TrialRecord};

/// Condition-average **Frequency × Time heatmap** for one repository.
///
/// # Pipeline steps
///
/// 1. Baseline the raw power with [`PipelineConfig::baseline_window`],
///    [`PipelineConfig::baseline_method`] and
///    [`PipelineConfig::baseline_scope`].  The result becomes the
///    repository's active baselined view.
/// 2. Look up the trials of `conditions` under [`PipelineConfig::strictness`].
/// 3. Keep those trials and, when `electrodes` is given, those electrodes.
/// 4. Average over Trial and Electrode, giving `[Frequency, Time]`.
/// 5. Clip into [`PipelineConfig::zlim`].
///
/// # Errors
///
/// * [`TfError::InvalidWindow`] if the baseline window selects no time sample.
/// * [`TfError::UnknownCondition`] for an unmatched label in strict mode.
/// * [`TfError::EmptySelection`] if no trial (or electrode) survives step 3.
///   In permissive mode this is what an all-typo condition list ends in.
/// * [`TfError::InvalidRange`] for an inverted explicit zlim.
pub fn condition_spectrogram<S: AsRef<str>>(
    repo: &mut SpectrogramRepository,
    index: &TrialIndex,
    session: &Session,
    conditions: &[S],
    electrodes: Option<&[String]>,
) -> Result<Heatmap> {
    let cfg = &session.config;

    let baselined = repo.apply_baseline(cfg.baseline_window, cfg.baseline_method, cfg.baseline_scope)?;

    let trials = index.trials_for(conditions, cfg.strictness)?;
    let in_list = |name: &str| electrodes.map_or(true, |list| list.iter().any(|e| e == name));
    let selected = select::subset(
        baselined,
        Some(&|id: TrialId| trials.contains(&id)),
        electrodes.map(|_| &in_list as &dyn Fn(&str) -> bool),
    )?;

    let averaged = select::collapse(&selected, &[Dim::Frequency, Dim::Time], cfg.nan_policy)?;
    let hm = Heatmap::from_array(&averaged, cfg.zlim)?;

    log::info!(
        "{}: {} trial(s) × {} electrode(s) → {:?} heatmap, zlim {:?}",
        session.label(),
        selected.shape()[2],
        selected.shape()[3],
        hm.data().dim(),
        hm.range()
    );
    Ok(hm)
}

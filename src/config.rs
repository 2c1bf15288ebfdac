//! Pipeline configuration and the explicit session context.
//!
//! [`PipelineConfig`] holds every tunable parameter of
//! [`condition_spectrogram`](crate::condition_spectrogram).  [`Session`] pairs
//! it with the subject/session identifiers that analysis scripts usually keep
//! in process-wide toolkit state; here it is passed explicitly instead.
use crate::baseline::{BaselineMethod, BaselineScope, BaselineWindow};
use crate::render::ValueRange;
use crate::select::NanPolicy;
use crate::trials::Strictness;

/// Configuration for the condition-average spectrogram pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use tfpower::{BaselineMethod, PipelineConfig};
///
/// let cfg = PipelineConfig {
///     baseline_method: BaselineMethod::Percent,
///     ..PipelineConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Reference interval on the Time axis, in seconds.
    ///
    /// Default: `[-0.5, -0.1]` (pre-stimulus).
    pub baseline_window: BaselineWindow,

    /// Default: [`BaselineMethod::Decibel`].
    pub baseline_method: BaselineMethod,

    /// Whether the reference pools trials or is taken per trial.
    ///
    /// Default: [`BaselineScope::Pooled`].
    pub baseline_scope: BaselineScope,

    /// Handling of condition labels that match no trial.
    ///
    /// Default: [`Strictness::Permissive`] (warn and continue).
    pub strictness: Strictness,

    /// NaN handling when averaging over trials and electrodes.
    ///
    /// Default: [`NanPolicy::Propagate`].
    pub nan_policy: NanPolicy,

    /// Color range the final heatmap is clipped into.
    ///
    /// Default: `±13` (dB).
    pub zlim: ValueRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            baseline_window: BaselineWindow::new(-0.5, -0.1),
            baseline_method: BaselineMethod::Decibel,
            baseline_scope: BaselineScope::Pooled,
            strictness: Strictness::Permissive,
            nan_policy: NanPolicy::Propagate,
            zlim: ValueRange::Explicit { min: -13.0, max: 13.0 },
        }
    }
}

/// Analysis context threaded through the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub subject: String,
    pub session: Option<String>,
    pub config: PipelineConfig,
}

impl Session {
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), ..Self::default() }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// `sub-<subject>[_ses-<session>]`, used to tag log lines and outputs.
    pub fn label(&self) -> String {
        match &self.session {
            Some(ses) => format!("sub-{}_ses-{ses}", self.subject),
            None => format!("sub-{}", self.subject),
        }
    }
}

//! Error kinds surfaced by every pipeline operation.
//!
//! All operations are deterministic, so none of these are retried: a failed
//! call returns the error and no partial result.
use crate::axis::{Dim, TrialId};

/// Errors returned by the core pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TfError {
    /// Requested electrodes, time window, frequencies or conditions are not
    /// present upstream.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Baseline window does not select any sample of the Time axis.
    #[error("invalid baseline window [{lo}, {hi}]: {reason}")]
    InvalidWindow { lo: f64, hi: f64, reason: String },

    /// Strict-mode lookup of a condition label that no trial carries.
    #[error("unknown condition {0:?}")]
    UnknownCondition(String),

    /// A selection removed every entry of an axis that must stay non-empty.
    #[error("empty selection on the {0} axis")]
    EmptySelection(Dim),

    /// The operation names an axis the array does not carry.
    #[error("array has no {0} axis")]
    MissingAxis(Dim),

    /// Array shape and axis labels disagree, or dims are out of order.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Explicit color range that is inverted or not finite.
    #[error("invalid value range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    /// The same trial identifier appears twice in a trial table.
    #[error("duplicate trial id {0}")]
    DuplicateTrial(TrialId),
}

pub type Result<T> = std::result::Result<T, TfError>;

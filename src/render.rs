//! Output contract toward an external rendering backend.
//!
//! Nothing is drawn here.  A [`Heatmap`] is a 2-D array already clipped into
//! its value range, paired with its row and column axes in the order of the
//! array's dimensions.  [`Heatmap::color_indices`] maps values onto an ordered
//! color lookup table of any length supplied by the backend.
use ndarray::{Array2, ArrayBase, Data, Dimension, Ix2};

use crate::axis::{Axis, TfArray};
use crate::error::{Result, TfError};
use crate::select::clip;

/// Color range (zlim).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRange {
    Explicit { min: f64, max: f64 },
    /// `(-m, m)` with `m` the largest finite absolute value in the data.
    Symmetric,
}

impl ValueRange {
    /// Concrete `(low, high)` for `data`.
    pub fn resolve<S, D>(&self, data: &ArrayBase<S, D>) -> Result<(f64, f64)>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        match *self {
            ValueRange::Explicit { min, max } => {
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(TfError::InvalidRange { min, max });
                }
                Ok((min, max))
            }
            ValueRange::Symmetric => {
                let m = data
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold(0.0_f64, |acc, v| acc.max(v.abs()));
                Ok((-m, m))
            }
        }
    }
}

/// Clipped 2-D raster input.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    data: Array2<f64>,
    rows: Axis,
    cols: Axis,
    low: f64,
    high: f64,
}

impl Heatmap {
    /// Build from a 2-D array (e.g. the output of
    /// `collapse(.., &[Dim::Frequency, Dim::Time], ..)`).
    pub fn from_array(array: &TfArray, zlim: ValueRange) -> Result<Self> {
        if array.ndim() != 2 {
            return Err(TfError::ShapeMismatch(format!(
                "heatmap needs 2 dims, got {:?}",
                array.dims()
            )));
        }
        let data = array
            .data()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| TfError::ShapeMismatch(e.to_string()))?;
        let (low, high) = zlim.resolve(&data)?;
        Ok(Self {
            data: clip(&data, low, high),
            rows: array.axes()[0].clone(),
            cols: array.axes()[1].clone(),
            low,
            high,
        })
    }

    /// Values, already inside [`range`](Self::range) (NaN excepted).
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn rows(&self) -> &Axis {
        &self.rows
    }

    pub fn cols(&self) -> &Axis {
        &self.cols
    }

    pub fn range(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Index of each cell into a lookup table of `n_colors` entries.
    ///
    /// `low` maps to 0 and `high` to `n_colors - 1`, linearly in between.
    /// NaN cells map to `None`.  A zero-width range maps every finite cell to
    /// the middle entry.
    pub fn color_indices(&self, n_colors: usize) -> Array2<Option<usize>> {
        let span = self.high - self.low;
        self.data.map(|&v| {
            if n_colors == 0 || v.is_nan() {
                return None;
            }
            if span <= 0.0 {
                return Some((n_colors - 1) / 2);
            }
            let pos = ((v - self.low) / span * n_colors as f64).floor();
            Some((pos.max(0.0) as usize).min(n_colors - 1))
        })
    }
}

//! Sweep results.
//!
//! A [`ResultGrid`] pairs the values `v` with coordinate grids that mirror
//! its axis dimensions. Coordinates are always derived from the
//! [`SweepSpec`], so a freshly computed sweep, a cache hit and a merged
//! parallel run all go through [`ResultGrid::assemble`].

use std::path::Path;

use serde::Serialize;

use crate::axis::Axis;
use crate::config::{SweepSpec, ThresholdMode};
use crate::error::{Result, SweepError};
use crate::grid::SweepGrid;

/// Coordinates and values of a completed sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultGrid {
    pub x: SweepGrid<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<SweepGrid<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<SweepGrid<f64>>,
    pub v: SweepGrid<f64>,
}

/// Location and value of an extremum of `v`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub x: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub value: f64,
}

impl ResultGrid {
    /// Attach coordinates from `spec` to the sweep values `v`.
    ///
    /// The leading dimensions of `v` must match the axes of `spec` (outermost
    /// first, without X when gradients collapse it); `v` may carry one extra
    /// trailing dimension for vector observables.
    pub fn assemble(spec: &SweepSpec, v: SweepGrid<f64>) -> Result<Self> {
        let leading = spec.leading_shape();
        if !matches_leading(&leading, v.shape()) {
            return Err(SweepError::Shape(format!(
                "values of shape {:?} do not match axis dimensions {:?}",
                v.shape(),
                leading
            )));
        }
        Ok(Self::with_coordinates(spec, &leading, v))
    }

    /// [`ResultGrid::assemble`] for values read back from `path`
    pub(crate) fn assemble_cached(spec: &SweepSpec, v: SweepGrid<f64>, path: &Path) -> Result<Self> {
        let leading = spec.leading_shape();
        if !matches_leading(&leading, v.shape()) {
            return Err(SweepError::CacheInconsistency {
                path: path.to_path_buf(),
                expected: leading,
                found: v.shape().to_vec(),
            });
        }
        Ok(Self::with_coordinates(spec, &leading, v))
    }

    fn with_coordinates(spec: &SweepSpec, leading: &[usize], v: SweepGrid<f64>) -> Self {
        // Innermost coordinate first; a collapsed X axis has no coordinate
        let skip = usize::from(spec.collapses());
        let axes: Vec<&Axis> = spec.axes().skip(skip).map(|(_, axis)| axis).collect();
        let rank = leading.len();

        let mut grids = axes.iter().enumerate().map(|(depth, axis)| {
            let position = rank - 1 - depth;
            let template = SweepGrid::new(leading.to_vec(), 0.0);
            let data = template
                .indices()
                .map(|index| axis.values()[index[position]])
                .collect();
            SweepGrid::from_data(leading.to_vec(), data)
                .unwrap_or_else(|| SweepGrid::new(leading.to_vec(), f64::NAN))
        });

        let x = grids
            .next()
            .unwrap_or_else(|| SweepGrid::new(leading.to_vec(), f64::NAN));
        Self {
            x,
            y: grids.next(),
            z: grids.next(),
            v,
        }
    }

    /// Shape of the values
    pub fn shape(&self) -> &[usize] {
        self.v.shape()
    }

    /// Locate the maximum (`minmax`) or minimum (`minmin`) of `v`, ignoring NaN.
    ///
    /// Returns `None` when every value is NaN.
    pub fn thresholds(&self, mode: ThresholdMode) -> Option<Thresholds> {
        let better = |candidate: f64, best: f64| match mode {
            ThresholdMode::MinMax => candidate > best,
            ThresholdMode::MinMin => candidate < best,
        };

        let (flat, value) = self
            .v
            .data()
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, value)| !value.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (i, value)| match best {
                Some((_, current)) if !better(value, current) => best,
                _ => Some((i, value)),
            })?;

        // Values of a vector observable share the coordinates of their point
        let points = self.x.len();
        if points == 0 {
            return None;
        }
        let coordinate = flat / (self.v.len() / points);

        Some(Thresholds {
            x: self.x.data()[coordinate],
            y: self.y.as_ref().map(|y| y.data()[coordinate]),
            z: self.z.as_ref().map(|z| z.data()[coordinate]),
            value,
        })
    }
}

fn matches_leading(leading: &[usize], shape: &[usize]) -> bool {
    (shape.len() == leading.len() || shape.len() == leading.len() + 1)
        && shape[..leading.len()] == *leading
}

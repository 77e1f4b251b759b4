//! Single-process sweep skeleton.
//!
//! A [`Sweep`] owns a working copy of the system parameters and evaluates
//! the X axis point by point. XY and XYZ sweeps set the outer variables on
//! the working copy and run the X axis once per outer point; every evaluate
//! call receives its own snapshot of the parameters.

use tracing::{debug, warn};

use crate::axis::Axis;
use crate::cache;
use crate::config::{SweepKind, SweepSpec};
use crate::error::{Result, SweepError};
use crate::evaluate::{Evaluate, Observable};
use crate::grid::SweepGrid;
use crate::numerics::{grad_index, gradient};
use crate::params::SystemParams;
use crate::progress::{ProgressSink, Updater};
use crate::results::ResultGrid;

const STATUS_LOOPING: &str = "Looping axes values";

/// Sweep skeleton over one [`SweepSpec`]
pub struct Sweep<'a, E: Evaluate + ?Sized> {
    spec: SweepSpec,
    evaluate: &'a E,
    params: SystemParams,
    sink: Box<dyn ProgressSink + 'a>,
    /// Progress position of the first point of the current row
    offset: usize,
    total: usize,
}

impl<'a, E: Evaluate + ?Sized> Sweep<'a, E> {
    /// Create a sweep with a private copy of `params` and a serial [`Updater`]
    pub fn new(spec: SweepSpec, evaluate: &'a E, params: &SystemParams) -> Self {
        let total = spec.axes().map(|(_, axis)| axis.dim()).product();
        Self {
            spec,
            evaluate,
            params: params.clone(),
            sink: Box::new(Updater::new()),
            offset: 0,
            total,
        }
    }

    /// Report through `sink` instead of the default updater
    #[must_use]
    pub fn with_sink(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn spec(&self) -> &SweepSpec {
        &self.spec
    }

    /// The working parameters, including the last outer-axis values set
    pub fn params(&self) -> &SystemParams {
        &self.params
    }

    /// Evaluate every X value against the working parameters.
    ///
    /// Returns the X values and the outputs, shaped `[nx]` for scalar
    /// observables and `[nx, width]` for vectors. Vectors of different
    /// lengths are padded with NaN to the longest one. With `grad`, the
    /// outputs are replaced by their derivative along X.
    pub fn evaluate_x_axis(&mut self) -> Result<(Vec<f64>, SweepGrid<f64>)> {
        let axis = self.spec.x().clone();
        let show_progress = self.spec.options().show_progress;

        let mut outputs = Vec::with_capacity(axis.dim());
        for (i, &value) in axis.values().iter().enumerate() {
            if show_progress {
                self.sink
                    .update_progress(Some(self.offset + i), self.total, STATUS_LOOPING, false);
            }
            outputs.push(self.evaluate_at(&axis, value)?);
        }

        let values = self.reconcile(outputs)?;
        let values = if self.spec.options().grad {
            gradient(&values, axis.values())?
        } else {
            values
        };
        Ok((axis.values().to_vec(), values))
    }

    fn evaluate_at(&self, axis: &Axis, value: f64) -> Result<Observable> {
        let mut snapshot = self.params.clone();
        snapshot.apply(axis.var(), axis.idx(), value)?;
        self.evaluate
            .evaluate(&snapshot)
            .map_err(|source| SweepError::Evaluate {
                var: axis.label(),
                value,
                source,
            })
    }

    /// Bring per-point outputs into one rectangular grid
    fn reconcile(&mut self, outputs: Vec<Observable>) -> Result<SweepGrid<f64>> {
        let points = outputs.len();
        let widths: Vec<Option<usize>> = outputs.iter().map(Observable::width).collect();

        if widths.iter().all(Option::is_none) {
            let data = outputs.iter().flat_map(|o| o.as_slice().to_vec()).collect();
            return Ok(SweepGrid::from_vec(data));
        }

        let width = widths.iter().map(|w| w.unwrap_or(1)).max().unwrap_or(0);
        let uniform = widths.iter().all(|w| *w == Some(width));
        if !uniform {
            self.sink
                .update_info(&format!("Reshaping with NaN values: New Length = {width}"));
            warn!(
                points,
                width, "Observable lengths differ, padding shorter outputs with NaN"
            );
        }

        let mut data = Vec::with_capacity(points * width);
        for output in &outputs {
            let values = output.as_slice();
            data.extend_from_slice(values);
            data.extend(std::iter::repeat_n(f64::NAN, width - values.len()));
        }
        SweepGrid::from_data(vec![points, width], data)
            .ok_or_else(|| SweepError::Shape(format!("cannot shape {points} outputs of width {width}")))
    }

    /// One row of the sweep: the X axis, reduced to a single gradient value
    /// when the sweep collapses X.
    fn row(&mut self) -> Result<SweepGrid<f64>> {
        let (xs, values) = self.evaluate_x_axis()?;
        if !self.spec.collapses() {
            return Ok(values);
        }
        let index = grad_index(&xs, self.spec.options().grad_position).unwrap_or(0);
        values
            .row(index)
            .ok_or_else(|| SweepError::Shape(format!("no gradient value at index {index}")))
    }

    fn outer_axis(&self, axis: Option<&Axis>) -> Result<Axis> {
        axis.cloned().ok_or_else(|| {
            SweepError::Shape(format!("{} sweep is missing an outer axis", self.spec.kind()))
        })
    }

    /// Run all axes and return the values, shaped `[nx, ..]`, `[ny, nx, ..]`
    /// or `[nz, ny, nx, ..]` (without `nx` when X collapses).
    pub fn sweep(&mut self) -> Result<SweepGrid<f64>> {
        let nx = self.spec.x().dim();
        debug!(kind = %self.spec.kind(), points = self.total, "Starting sweep");

        let values = match self.spec.kind() {
            SweepKind::X => {
                self.offset = 0;
                self.evaluate_x_axis()?.1
            }
            SweepKind::XY => {
                let y = self.outer_axis(self.spec.y())?;
                let mut rows = Vec::with_capacity(y.dim());
                for (j, &value) in y.values().iter().enumerate() {
                    self.params.apply(y.var(), y.idx(), value)?;
                    self.offset = j * nx;
                    rows.push(self.row()?);
                }
                SweepGrid::stack(rows)?
            }
            SweepKind::XYZ => {
                let y = self.outer_axis(self.spec.y())?;
                let z = self.outer_axis(self.spec.z())?;
                let (ny, nz) = (y.dim(), z.dim());

                let mut rows = Vec::with_capacity(ny * nz);
                for k in 0..ny * nz {
                    self.params.apply(y.var(), y.idx(), y.values()[k % ny])?;
                    self.params.apply(z.var(), z.idx(), z.values()[k / ny])?;
                    self.offset = k * nx;
                    rows.push(self.row()?);
                }

                let stacked = SweepGrid::stack(rows)?;
                let mut shape = vec![nz, ny];
                shape.extend_from_slice(&stacked.shape()[1..]);
                stacked
                    .reshape(shape)
                    .ok_or_else(|| SweepError::Shape("cannot split Y and Z dimensions".to_string()))?
            }
        };

        if self.spec.options().show_progress {
            self.sink.update_progress(Some(1), 1, STATUS_LOOPING, false);
            self.sink.update_info("Results Obtained");
        }
        Ok(values)
    }

    /// Run the sweep through the cache.
    ///
    /// With a cache prefix, stored results are returned without evaluating;
    /// otherwise the sweep runs and its values are saved before returning.
    pub fn run(&mut self) -> Result<ResultGrid> {
        let path = cache::path_for(&self.spec, &self.params);

        if let Some(path) = &path {
            if let Some(results) = cache::load_results(&self.spec, path)? {
                self.sink.update_info("Results Loaded");
                return Ok(results);
            }
        }

        let values = self.sweep()?;
        let results = ResultGrid::assemble(&self.spec, values)?;

        if let Some(path) = &path {
            cache::save(path, &results.v)?;
            self.sink.update_info("Results Saved");
        }
        Ok(results)
    }
}

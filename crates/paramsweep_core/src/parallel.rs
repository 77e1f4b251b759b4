//! Parallel sweep orchestration.
//!
//! The outermost axis is split into contiguous slices, one per worker. Each
//! worker runs its own [`Sweep`] over a sub-spec with a private copy of the
//! parameters; slices are merged in worker order, so the result matches a
//! serial run over the full axis. Partitioning is static.

use std::ops::Range;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cache;
use crate::config::{SweepKind, SweepSpec};
use crate::error::{Result, SweepError};
use crate::evaluate::Evaluate;
use crate::grid::SweepGrid;
use crate::numerics::gradient;
use crate::params::SystemParams;
use crate::progress::{ProgressSink, Updater};
use crate::results::ResultGrid;
use crate::sweep::Sweep;

/// Cores kept free for the caller and the OS
const RESERVED_CORES: usize = 2;

/// Number of logical cores, 1 when unknown
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Worker count for an axis of `len` points.
///
/// The upper bound is `min(cores - 2, len)` but never below one; a
/// requested count is clamped to `[1, bound]` and the bound is used when
/// nothing is requested.
pub fn resolve_workers(requested: Option<usize>, len: usize, cores: usize) -> usize {
    let bound = cores.saturating_sub(RESERVED_CORES).min(len).max(1);
    requested.map_or(bound, |n| n.clamp(1, bound))
}

/// Static split of an axis into contiguous slices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    len: usize,
    workers: usize,
    slice_dim: usize,
}

impl Partition {
    /// Split `len` points across at most `workers` workers.
    ///
    /// `slice_dim = ceil(len / workers)`; every worker but the last takes
    /// `slice_dim` points. Workers are dropped while the last one would get
    /// nothing. The loop ends because `workers` strictly decreases and stops
    /// at one; once `slice_dim * (workers - 1) < len` the last worker holds
    /// `len - slice_dim * (workers - 1) >= 1` points.
    pub fn new(len: usize, workers: usize) -> Self {
        let len = len.max(1);
        let mut workers = workers.clamp(1, len);
        let slice_dim = len.div_ceil(workers);
        while workers > 1 && slice_dim * (workers - 1) >= len {
            workers -= 1;
        }
        Self {
            len,
            workers,
            slice_dim,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn slice_dim(&self) -> usize {
        self.slice_dim
    }

    /// Index ranges of each worker's slice, in worker order
    pub fn ranges(&self) -> Vec<Range<usize>> {
        (0..self.workers)
            .map(|k| k * self.slice_dim..((k + 1) * self.slice_dim).min(self.len))
            .collect()
    }
}

/// Run `spec` across workers and merge the slices.
///
/// The unsliced spec is looked up in the cache first. Worker sub-specs never
/// touch the cache; the merged result is saved once. For 1D sweeps the
/// gradient is taken after merging so slice boundaries do not change the
/// derivative. The first failing worker aborts the run.
pub fn run_parallel<E: Evaluate + ?Sized>(
    spec: &SweepSpec,
    evaluate: &E,
    params: &SystemParams,
    sink: &mut dyn ProgressSink,
) -> Result<ResultGrid> {
    let path = cache::path_for(spec, params);
    if let Some(path) = &path {
        if let Some(results) = cache::load_results(spec, path)? {
            sink.update_info("Results Loaded");
            return Ok(results);
        }
    }

    let sliced = spec.kind().sliced_axis();
    let axis = spec.sliced_axis();
    let workers = resolve_workers(spec.options().num_workers, axis.dim(), available_cores());
    let partition = Partition::new(axis.dim(), workers);
    info!(
        axis = %sliced,
        points = axis.dim(),
        workers = partition.workers(),
        slice_dim = partition.slice_dim(),
        "Partitioned sweep"
    );

    let defer_grad = spec.kind() == SweepKind::X && spec.options().grad;
    let slices: Vec<SweepSpec> = partition
        .ranges()
        .into_iter()
        .map(|range| {
            let mut slice = spec.with_axis_values(sliced, axis.values()[range].to_vec());
            let options = slice.options_mut();
            options.cache_file_prefix = None;
            if defer_grad {
                options.grad = false;
            }
            slice
        })
        .collect();

    let started = Instant::now();
    let parts = run_workers(slices, evaluate, params, started)?;
    debug!(elapsed = ?started.elapsed(), "Workers finished");

    let mut values = SweepGrid::concat(parts)?;
    if defer_grad {
        values = gradient(&values, spec.x().values())?;
    }
    let results = ResultGrid::assemble(spec, values)?;
    if spec.options().show_progress {
        sink.update_info("Results Obtained");
    }

    if let Some(path) = &path {
        cache::save(path, &results.v)?;
        sink.update_info("Results Saved");
    }
    Ok(results)
}

fn run_slice<E: Evaluate + ?Sized>(
    index: usize,
    spec: SweepSpec,
    evaluate: &E,
    params: &SystemParams,
    started: Instant,
) -> Result<SweepGrid<f64>> {
    Sweep::new(spec, evaluate, params)
        .with_sink(Updater::parallel(index, started))
        .sweep()
        .map_err(|source| SweepError::Worker {
            index,
            source: Box::new(source),
        })
}

#[cfg(feature = "parallel")]
fn run_workers<E: Evaluate + ?Sized>(
    slices: Vec<SweepSpec>,
    evaluate: &E,
    params: &SystemParams,
    started: Instant,
) -> Result<Vec<SweepGrid<f64>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(slices.len())
        .thread_name(|i| format!("sweep-worker-{i}"))
        .build()
        .map_err(|e| SweepError::WorkerPool(e.to_string()))?;

    // Indexed collect keeps worker order regardless of completion order
    pool.install(|| {
        slices
            .into_par_iter()
            .enumerate()
            .map(|(index, spec)| run_slice(index, spec, evaluate, params, started))
            .collect()
    })
}

#[cfg(not(feature = "parallel"))]
fn run_workers<E: Evaluate + ?Sized>(
    slices: Vec<SweepSpec>,
    evaluate: &E,
    params: &SystemParams,
    started: Instant,
) -> Result<Vec<SweepGrid<f64>>> {
    slices
        .into_iter()
        .enumerate()
        .map(|(index, spec)| run_slice(index, spec, evaluate, params, started))
        .collect()
}

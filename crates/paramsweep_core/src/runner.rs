//! Entry point dispatching a sweep on its execution mode.

use crate::config::{ExecutionMode, SweepSpec};
use crate::error::Result;
use crate::evaluate::Evaluate;
use crate::params::SystemParams;
use crate::parallel::run_parallel;
use crate::progress::{ProgressSink, Updater};
use crate::results::ResultGrid;
use crate::sweep::Sweep;

/// Run `spec` serially or across workers, reporting through a default
/// [`Updater`].
pub fn run<E: Evaluate + ?Sized>(
    spec: &SweepSpec,
    evaluate: &E,
    params: &SystemParams,
) -> Result<ResultGrid> {
    run_with_sink(spec, evaluate, params, &mut Updater::new())
}

/// [`run`] with a caller-provided progress sink
pub fn run_with_sink<E: Evaluate + ?Sized>(
    spec: &SweepSpec,
    evaluate: &E,
    params: &SystemParams,
    sink: &mut dyn ProgressSink,
) -> Result<ResultGrid> {
    match spec.options().execution_mode {
        ExecutionMode::Serial => Sweep::new(spec.clone(), evaluate, params)
            .with_sink(sink)
            .run(),
        ExecutionMode::Parallel => run_parallel(spec, evaluate, params, sink),
    }
}

//! Scenario tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `sweep_1d` - X sweeps, axis generation, gradients and shape reconciliation
//! - `sweep_nd` - XY/XYZ sweeps, outer-axis ordering and gradient collapse
//! - `caching` - Cached runs, legacy migration and consistency checks
//! - `parallel` - Parallel/serial equivalence and worker failures

mod parallel;

use crate::axis::AxisConfig;
use crate::config::{SweepConfig, SweepKind, SweepSpec};
use crate::error::EvaluateError;
use crate::params::SystemParams;

/// Number parameter, 0.0 when absent
fn number_or_zero(params: &SystemParams, name: &str) -> f64 {
    params.number(name).unwrap_or(0.0)
}

/// `x + 10 y + 100 z`, so every grid cell is distinguishable
fn positional(params: &SystemParams) -> Result<f64, EvaluateError> {
    Ok(number_or_zero(params, "x")
        + 10.0 * number_or_zero(params, "y")
        + 100.0 * number_or_zero(params, "z"))
}

/// Real roots of `t^2 - x`: none, one or two depending on the sign of `x`
fn square_roots(params: &SystemParams) -> Result<Vec<f64>, EvaluateError> {
    let x = params.number("x")?;
    Ok(if x > 0.0 {
        vec![-x.sqrt(), x.sqrt()]
    } else if x == 0.0 {
        vec![0.0]
    } else {
        Vec::new()
    })
}

fn build(kind: SweepKind, config: SweepConfig) -> SweepSpec {
    SweepSpec::build(kind, &config).unwrap()
}

fn xy_config(nx: usize, ny: usize) -> SweepConfig {
    SweepConfig {
        x: Some(AxisConfig::range("x", 0.0, (nx - 1) as f64, nx)),
        y: Some(AxisConfig::range("y", 1.0, ny as f64, ny)),
        ..SweepConfig::default()
    }
}

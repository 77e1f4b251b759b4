//! Parameter sweep engine
//!
//! This crate evaluates an observable of a system over one, two or three
//! swept parameter axes. It supports:
//! - Linear, logarithmic and explicit axes with exact decimal rounding
//! - Scalar and variable-length vector observables (NaN padded)
//! - Numerical gradients along X, optionally collapsed to one X position
//! - A `.npz` result cache keyed by the sweep and system parameters
//! - Parallel execution over static slices of the outermost axis
//! - Throttled progress reporting for consoles and UI callbacks
//!
//! # Example
//!
//! ```ignore
//! use paramsweep_core::{AxisConfig, SweepConfig, SweepKind, SweepSpec, SystemParams};
//!
//! let config = SweepConfig {
//!     x: Some(AxisConfig::range("detuning", -1.0, 1.0, 201)),
//!     y: Some(AxisConfig::values("coupling", vec![0.1, 0.2, 0.4])),
//!     ..SweepConfig::default()
//! };
//! let spec = SweepSpec::build(SweepKind::XY, &config)?;
//! let params = SystemParams::new().with("detuning", 0.0).with("coupling", 0.1);
//!
//! let results = paramsweep_core::run(&spec, &my_observable, &params)?;
//! println!("{:?}", results.v.shape());
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod cache;
pub mod error;
pub mod evaluate;
pub mod numerics;
pub mod parallel;
pub mod progress;
pub mod runner;
pub mod sweep;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod axis;
pub mod config;
pub mod grid;
pub mod params;
pub mod results;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use axis::{Axis, AxisConfig, Scale};
pub use config::{
    AxisId, ExecutionMode, GradPosition, SweepConfig, SweepKind, SweepOptions, SweepSpec,
    ThresholdMode,
};
pub use error::{CacheError, ConfigError, EvaluateError, ParamError, SweepError};
pub use evaluate::{Evaluate, Observable};
pub use grid::SweepGrid;
pub use params::{ParamValue, SystemParams, format_float};
pub use parallel::run_parallel;
pub use progress::{ProgressSink, StatusCallback, Updater};
pub use results::{ResultGrid, Thresholds};
pub use runner::{run, run_with_sink};
pub use sweep::Sweep;

//! Command-line front end for the paramsweep engine
//!
//! Loads a run file, sweeps one of the built-in models and reports the
//! result shape and threshold.

pub mod config;
pub mod logging;
pub mod models;
pub mod report;

pub use config::{RunConfig, RunConfigError};
pub use logging::init_logging;
pub use models::{Model, Operand};
pub use report::{RunReport, summarize};

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{AxisId, SweepKind};

/// Errors raised while resolving a sweep configuration.
///
/// These always surface before the first evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{kind} sweep requires axis {axis}")]
    MissingAxis { axis: AxisId, kind: SweepKind },
    #[error("axis {axis} should define `var` for the name of the variable")]
    MissingVariable { axis: AxisId },
    #[error("axis {axis} should define `val` or both `min` and `max`")]
    MissingRange { axis: AxisId },
    #[error("axis {axis} has no values")]
    EmptyAxis { axis: AxisId },
    #[error("axis {axis} uses a log scale with non-positive bounds (min={min}, max={max})")]
    InvalidLogBounds { axis: AxisId, min: f64, max: f64 },
    #[error("gradients need at least two X-axis values, found {found}")]
    GradientTooShort { found: usize },
    #[error("failed to parse sweep configuration: {0}")]
    Parse(String),
}

/// Errors related to system parameter lookups and updates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("parameter `{0}` not found")]
    Missing(String),
    #[error("parameter `{0}` is not a number")]
    NotANumber(String),
    #[error("parameter `{name}` cannot be indexed at {index}")]
    NotIndexable { name: String, index: usize },
}

/// Failure reported by an evaluate function.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EvaluateError {
    message: String,
}

impl EvaluateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ParamError> for EvaluateError {
    fn from(err: ParamError) -> Self {
        EvaluateError::new(err.to_string())
    }
}

/// Errors related to reading and writing cached result arrays
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("invalid array file: {0}")]
    Format(String),
}

/// Top-level error of a sweep run
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error("evaluation failed at {var} = {value}: {source}")]
    Evaluate {
        var: String,
        value: f64,
        #[source]
        source: EvaluateError,
    },
    #[error("worker #{index} failed: {source}")]
    Worker {
        index: usize,
        #[source]
        source: Box<SweepError>,
    },
    #[error(
        "cached result {} has shape {found:?}, expected leading dimensions {expected:?}",
        path.display()
    )]
    CacheInconsistency {
        path: PathBuf,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("inconsistent result shape: {0}")]
    Shape(String),
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, SweepError>;

//! The evaluate contract between the sweep engine and the system under test.

use serde::{Deserialize, Serialize};

use crate::error::EvaluateError;
use crate::params::SystemParams;

/// Value returned by one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observable {
    Scalar(f64),
    /// A fixed or variable length sequence (e.g. a set of roots)
    Vector(Vec<f64>),
}

impl Observable {
    /// Length of a vector output, `None` for scalars
    pub fn width(&self) -> Option<usize> {
        match self {
            Observable::Scalar(_) => None,
            Observable::Vector(values) => Some(values.len()),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Observable::Scalar(value) => std::slice::from_ref(value),
            Observable::Vector(values) => values,
        }
    }
}

impl From<f64> for Observable {
    fn from(value: f64) -> Self {
        Observable::Scalar(value)
    }
}

impl From<Vec<f64>> for Observable {
    fn from(values: Vec<f64>) -> Self {
        Observable::Vector(values)
    }
}

impl<const N: usize> From<[f64; N]> for Observable {
    fn from(values: [f64; N]) -> Self {
        Observable::Vector(values.to_vec())
    }
}

/// A function of the system parameters.
///
/// Implementations must be deterministic for identical parameters (cached
/// results rely on it) and must not depend on process-global mutable state,
/// since workers call them concurrently.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, params: &SystemParams) -> Result<Observable, EvaluateError>;
}

impl<F, O> Evaluate for F
where
    F: Fn(&SystemParams) -> Result<O, EvaluateError> + Send + Sync,
    O: Into<Observable>,
{
    fn evaluate(&self, params: &SystemParams) -> Result<Observable, EvaluateError> {
        self(params).map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_implements_evaluate() {
        let double = |params: &SystemParams| -> Result<f64, EvaluateError> {
            Ok(params.number("x")? * 2.0)
        };
        let params = SystemParams::new().with("x", 1.5);

        assert_eq!(double.evaluate(&params).unwrap(), Observable::Scalar(3.0));
    }

    #[test]
    fn test_missing_parameter_becomes_evaluate_error() {
        let read = |params: &SystemParams| -> Result<f64, EvaluateError> {
            Ok(params.number("x")?)
        };
        let err = read.evaluate(&SystemParams::new()).unwrap_err();
        assert_eq!(err.message(), "parameter `x` not found");
    }

    #[test]
    fn test_observable_width() {
        assert_eq!(Observable::Scalar(1.0).width(), None);
        assert_eq!(Observable::from([1.0, 2.0]).width(), Some(2));
        assert_eq!(Observable::Scalar(4.0).as_slice(), &[4.0]);
    }
}

//! Swept axes.
//!
//! An [`AxisConfig`] is the declarative form read from configuration: either
//! an explicit value list or a `min`/`max`/`dim` range. [`Axis::build`]
//! resolves it into the ordered values the sweep iterates over.

use serde::{Deserialize, Serialize};

use crate::config::AxisId;
use crate::error::ConfigError;

/// Number of points of a range axis without an explicit `dim`
pub const DEFAULT_DIM: usize = 101;

/// Largest number of decimals considered when rounding linear axes
const MAX_DECIMALS: u32 = 17;

/// Spacing of generated axis values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Linear,
    Log,
}

/// Declarative axis definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Name of the swept system parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
    /// Element of a list parameter to sweep
    #[serde(default, alias = "index", skip_serializing_if = "Option::is_none")]
    pub idx: Option<usize>,
    /// Explicit values, used verbatim
    #[serde(default, alias = "values", skip_serializing_if = "Option::is_none")]
    pub val: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<usize>,
    #[serde(default)]
    pub scale: Scale,
}

impl AxisConfig {
    /// Axis over an explicit list of values
    pub fn values(var: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            var: Some(var.into()),
            val: Some(values),
            ..Self::default()
        }
    }

    /// Linear axis of `dim` points from `min` to `max`
    pub fn range(var: impl Into<String>, min: f64, max: f64, dim: usize) -> Self {
        Self {
            var: Some(var.into()),
            min: Some(min),
            max: Some(max),
            dim: Some(dim),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn index(mut self, idx: usize) -> Self {
        self.idx = Some(idx);
        self
    }

    #[must_use]
    pub fn log(mut self) -> Self {
        self.scale = Scale::Log;
        self
    }
}

/// A resolved axis. The value list is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    var: String,
    idx: Option<usize>,
    values: Vec<f64>,
}

impl Axis {
    pub fn build(axis: AxisId, config: &AxisConfig) -> Result<Self, ConfigError> {
        let var = config
            .var
            .clone()
            .ok_or(ConfigError::MissingVariable { axis })?;

        let values = match (&config.val, config.min, config.max) {
            (Some(values), _, _) => values.clone(),
            (None, Some(min), Some(max)) => {
                let dim = config.dim.unwrap_or(DEFAULT_DIM);
                match config.scale {
                    Scale::Linear => linear_values(min, max, dim),
                    Scale::Log => {
                        if min <= 0.0 || max <= 0.0 {
                            return Err(ConfigError::InvalidLogBounds { axis, min, max });
                        }
                        log_values(min, max, dim)
                    }
                }
            }
            _ => return Err(ConfigError::MissingRange { axis }),
        };

        if values.is_empty() {
            return Err(ConfigError::EmptyAxis { axis });
        }

        Ok(Self {
            var,
            idx: config.idx,
            values,
        })
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn idx(&self) -> Option<usize> {
        self.idx
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// First value
    pub fn min(&self) -> f64 {
        self.values[0]
    }

    /// Last value
    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Variable label as used in logs and cache keys, e.g. `g[1]`
    pub fn label(&self) -> String {
        match self.idx {
            Some(idx) => format!("{}[{idx}]", self.var),
            None => self.var.clone(),
        }
    }

    /// Same variable over a different, non-empty value list
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert!(!values.is_empty());
        Self {
            var: self.var.clone(),
            idx: self.idx,
            values,
        }
    }
}

/// Evenly spaced values rounded to the precision of the step size
fn linear_values(min: f64, max: f64, dim: usize) -> Vec<f64> {
    match dim {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let steps = (dim - 1) as f64;
            let step = (max - min) / steps;
            let mut values: Vec<f64> = (0..dim).map(|i| i as f64 * step + min).collect();
            values[dim - 1] = max;

            if let Some(decimals) = step_decimals(min, max, dim - 1) {
                for value in &mut values {
                    *value = round_to(*value, decimals);
                }
            }
            values
        }
    }
}

/// Geometrically spaced values between two positive bounds
fn log_values(min: f64, max: f64, dim: usize) -> Vec<f64> {
    match dim {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let (start, stop) = (min.log10(), max.log10());
            let step = (stop - start) / (dim - 1) as f64;
            (0..dim)
                .map(|i| {
                    let exponent = if i == dim - 1 {
                        stop
                    } else {
                        start + i as f64 * step
                    };
                    10f64.powf(exponent)
                })
                .collect()
        }
    }
}

/// Number of decimals of `(max - min) / steps`, computed exactly on the
/// shortest decimal forms of the bounds.
///
/// Returns `None` when the quotient does not terminate within
/// [`MAX_DECIMALS`] digits or the bounds are too large to represent.
fn step_decimals(min: f64, max: f64, steps: usize) -> Option<u32> {
    let (min_digits, min_scale) = parse_decimal(min)?;
    let (max_digits, max_scale) = parse_decimal(max)?;
    let scale = min_scale.max(max_scale);

    let min_digits = min_digits.checked_mul(10i128.checked_pow(scale - min_scale)?)?;
    let max_digits = max_digits.checked_mul(10i128.checked_pow(scale - max_scale)?)?;
    let diff = max_digits.checked_sub(min_digits)?.checked_abs()?;

    // diff / (steps * 10^scale) has d decimals when diff * 10^d divides evenly
    let divisor = i128::try_from(steps)
        .ok()?
        .checked_mul(10i128.checked_pow(scale)?)?;
    (0..=MAX_DECIMALS).find(|&decimals| {
        10i128
            .checked_pow(decimals)
            .and_then(|factor| diff.checked_mul(factor))
            .is_some_and(|scaled| scaled % divisor == 0)
    })
}

/// Integer mantissa and decimal scale of the shortest representation of `value`
fn parse_decimal(value: f64) -> Option<(i128, u32)> {
    if !value.is_finite() {
        return None;
    }
    let text = value.to_string();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut digits: i128 = 0;
    for ch in whole.chars().chain(fraction.chars()) {
        let digit = ch.to_digit(10)?;
        digits = digits.checked_mul(10)?.checked_add(i128::from(digit))?;
    }
    let scale = u32::try_from(fraction.len()).ok()?;
    Some((if negative { -digits } else { digits }, scale))
}

fn round_to(value: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_quarter_steps() {
        let axis = Axis::build(AxisId::X, &AxisConfig::range("x", 0.0, 1.0, 5)).unwrap();
        assert_eq!(axis.values(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(axis.min(), 0.0);
        assert_eq!(axis.max(), 1.0);
        assert_eq!(axis.dim(), 5);
    }

    #[test]
    fn test_linear_rounding_removes_drift() {
        let axis = Axis::build(AxisId::X, &AxisConfig::range("x", 0.1, 0.3, 3)).unwrap();
        assert_eq!(axis.values(), &[0.1, 0.2, 0.3]);

        let axis = Axis::build(AxisId::X, &AxisConfig::range("x", -1.0, 1.0, 21)).unwrap();
        assert_eq!(axis.values()[3], -0.7);
        assert_eq!(axis.values()[10], 0.0);
    }

    #[test]
    fn test_linear_default_dim_and_order() {
        let config = AxisConfig {
            dim: None,
            ..AxisConfig::range("x", 0.0, 10.0, 0)
        };
        let axis = Axis::build(AxisId::X, &config).unwrap();
        assert_eq!(axis.dim(), DEFAULT_DIM);
        assert!(axis.values().windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(axis.values()[1], 0.1);
        assert_eq!(axis.max(), 10.0);
    }

    #[test]
    fn test_non_terminating_step_is_not_rounded() {
        assert_eq!(step_decimals(0.0, 1.0, 3), None);
        let axis = Axis::build(AxisId::X, &AxisConfig::range("x", 0.0, 1.0, 4)).unwrap();
        assert_eq!(axis.values()[1], 1.0 / 3.0);
        assert_eq!(axis.max(), 1.0);
    }

    #[test]
    fn test_step_decimals() {
        assert_eq!(step_decimals(0.0, 1.0, 4), Some(2));
        assert_eq!(step_decimals(0.0, 100.0, 4), Some(0));
        assert_eq!(step_decimals(-2.5, 2.5, 2), Some(1));
        assert_eq!(step_decimals(1.0, 0.0, 4), Some(2));
    }

    #[test]
    fn test_single_point_axis() {
        let axis = Axis::build(AxisId::Y, &AxisConfig::range("y", 2.0, 5.0, 1)).unwrap();
        assert_eq!(axis.values(), &[2.0]);
    }

    #[test]
    fn test_log_axis() {
        let axis = Axis::build(AxisId::X, &AxisConfig::range("x", 1.0, 100.0, 3).log()).unwrap();
        assert_eq!(axis.dim(), 3);
        assert!((axis.values()[0] - 1.0).abs() < 1e-12);
        assert!((axis.values()[1] - 10.0).abs() < 1e-12);
        assert!((axis.values()[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_axis_rejects_non_positive_bounds() {
        let err = Axis::build(AxisId::X, &AxisConfig::range("x", 0.0, 1.0, 3).log()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogBounds { .. }));
    }

    #[test]
    fn test_explicit_values_used_verbatim() {
        let axis =
            Axis::build(AxisId::X, &AxisConfig::values("g", vec![3.0, 1.0, 2.0]).index(1)).unwrap();
        assert_eq!(axis.values(), &[3.0, 1.0, 2.0]);
        assert_eq!(axis.label(), "g[1]");
    }

    #[test]
    fn test_configuration_errors() {
        let missing_var = AxisConfig {
            var: None,
            ..AxisConfig::range("x", 0.0, 1.0, 3)
        };
        assert_eq!(
            Axis::build(AxisId::X, &missing_var),
            Err(ConfigError::MissingVariable { axis: AxisId::X })
        );

        let missing_max = AxisConfig {
            max: None,
            ..AxisConfig::range("x", 0.0, 1.0, 3)
        };
        assert_eq!(
            Axis::build(AxisId::Y, &missing_max),
            Err(ConfigError::MissingRange { axis: AxisId::Y })
        );

        assert_eq!(
            Axis::build(AxisId::Z, &AxisConfig::values("z", vec![])),
            Err(ConfigError::EmptyAxis { axis: AxisId::Z })
        );
        assert_eq!(
            Axis::build(AxisId::X, &AxisConfig::range("x", 0.0, 1.0, 0)),
            Err(ConfigError::EmptyAxis { axis: AxisId::X })
        );
    }
}

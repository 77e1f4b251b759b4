//! Built-in systems that can be swept from a configuration file
//!
//! Each model reads its inputs from the system parameters, so any input can
//! be bound to a sweep axis by naming the same variable.

use paramsweep_core::{Evaluate, EvaluateError, Observable, ParamError, SystemParams};
use serde::{Deserialize, Serialize};

/// A literal number or the name of a system parameter.
///
/// Parameter names may index into list parameters: `g[1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Param(String),
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Value(0.0)
    }
}

fn unit() -> Operand {
    Operand::Value(1.0)
}

impl Operand {
    pub fn resolve(&self, params: &SystemParams) -> Result<f64, ParamError> {
        match self {
            Operand::Value(value) => Ok(*value),
            Operand::Param(name) => match parse_indexed(name) {
                Some((base, index)) => params.element(base, index),
                None => params.number(name),
            },
        }
    }
}

/// Split `name[index]` into its parts
fn parse_indexed(name: &str) -> Option<(&str, usize)> {
    let (base, rest) = name.split_once('[')?;
    let index = rest.strip_suffix(']')?.trim().parse().ok()?;
    Some((base.trim(), index))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Model {
    /// `slope * input + offset`
    Linear {
        input: Operand,
        #[serde(default = "unit")]
        slope: Operand,
        #[serde(default)]
        offset: Operand,
    },
    /// Lorentzian line of full width `width` centered on `center`
    Lorentzian {
        input: Operand,
        center: Operand,
        width: Operand,
        #[serde(default = "unit")]
        amplitude: Operand,
    },
    /// Real roots of `a t^2 + b t + c`, ascending; zero, one or two values
    QuadraticRoots { a: Operand, b: Operand, c: Operand },
    /// Product of all factors
    Product { factors: Vec<Operand> },
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Model::Linear { .. } => "linear",
            Model::Lorentzian { .. } => "lorentzian",
            Model::QuadraticRoots { .. } => "quadratic_roots",
            Model::Product { .. } => "product",
        }
    }
}

impl Evaluate for Model {
    fn evaluate(&self, params: &SystemParams) -> Result<Observable, EvaluateError> {
        match self {
            Model::Linear {
                input,
                slope,
                offset,
            } => {
                let x = input.resolve(params)?;
                Ok(Observable::Scalar(
                    slope.resolve(params)? * x + offset.resolve(params)?,
                ))
            }
            Model::Lorentzian {
                input,
                center,
                width,
                amplitude,
            } => {
                let width = width.resolve(params)?;
                if width <= 0.0 {
                    return Err(EvaluateError::new(format!(
                        "lorentzian width must be positive, got {width}"
                    )));
                }
                let half = width / 2.0;
                let detuning = input.resolve(params)? - center.resolve(params)?;
                let value = amplitude.resolve(params)? * half * half
                    / (detuning * detuning + half * half);
                Ok(Observable::Scalar(value))
            }
            Model::QuadraticRoots { a, b, c } => Ok(Observable::Vector(quadratic_roots(
                a.resolve(params)?,
                b.resolve(params)?,
                c.resolve(params)?,
            ))),
            Model::Product { factors } => factors
                .iter()
                .try_fold(1.0, |product, factor| {
                    factor.resolve(params).map(|value| product * value)
                })
                .map(Observable::Scalar)
                .map_err(EvaluateError::from),
        }
    }
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        return if b == 0.0 { Vec::new() } else { vec![-c / b] };
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        Vec::new()
    } else if discriminant == 0.0 {
        vec![-b / (2.0 * a)]
    } else {
        let sqrt = discriminant.sqrt();
        let mut roots = vec![(-b - sqrt) / (2.0 * a), (-b + sqrt) / (2.0 * a)];
        roots.sort_by(f64::total_cmp);
        roots
    }
}

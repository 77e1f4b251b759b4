//! Sweep configuration.
//!
//! [`SweepConfig`] mirrors the configuration surface (unknown keys are
//! ignored). [`SweepSpec::build`] validates it for one [`SweepKind`] and
//! produces the immutable spec every sweep runs from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisConfig};
use crate::error::ConfigError;
use crate::params::format_float;

/// One of the three sweepable axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisId {
    X,
    Y,
    Z,
}

impl AxisId {
    /// Lowercase name used in cache keys
    pub fn key(self) -> &'static str {
        match self {
            AxisId::X => "x",
            AxisId::Y => "y",
            AxisId::Z => "z",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AxisId::X => "X",
            AxisId::Y => "Y",
            AxisId::Z => "Z",
        };
        f.write_str(name)
    }
}

/// Dimensionality of a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepKind {
    #[default]
    X,
    XY,
    XYZ,
}

impl SweepKind {
    /// Active axes, innermost first
    pub fn axes(self) -> &'static [AxisId] {
        match self {
            SweepKind::X => &[AxisId::X],
            SweepKind::XY => &[AxisId::X, AxisId::Y],
            SweepKind::XYZ => &[AxisId::X, AxisId::Y, AxisId::Z],
        }
    }

    /// Outermost axis, the one split across workers
    pub fn sliced_axis(self) -> AxisId {
        match self {
            SweepKind::X => AxisId::X,
            SweepKind::XY => AxisId::Y,
            SweepKind::XYZ => AxisId::Z,
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepKind::X => "X",
            SweepKind::XY => "XY",
            SweepKind::XYZ => "XYZ",
        };
        f.write_str(name)
    }
}

/// Where gradients are sampled along the X axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GradPositionRepr", into = "GradPositionRepr")]
pub enum GradPosition {
    /// Keep the full gradient
    #[default]
    All,
    /// Value closest to the mean X value
    Mean,
    /// Value closest to the given X value
    At(f64),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GradPositionRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<GradPositionRepr> for GradPosition {
    type Error = String;

    fn try_from(repr: GradPositionRepr) -> Result<Self, Self::Error> {
        match repr {
            GradPositionRepr::Number(value) => Ok(GradPosition::At(value)),
            GradPositionRepr::Text(text) => match text.as_str() {
                "all" => Ok(GradPosition::All),
                "mean" => Ok(GradPosition::Mean),
                other => other.parse().map(GradPosition::At).map_err(|_| {
                    format!("grad_position should be `all`, `mean` or a number, got `{other}`")
                }),
            },
        }
    }
}

impl From<GradPosition> for GradPositionRepr {
    fn from(position: GradPosition) -> Self {
        match position {
            GradPosition::All => GradPositionRepr::Text("all".to_string()),
            GradPosition::Mean => GradPositionRepr::Text("mean".to_string()),
            GradPosition::At(value) => GradPositionRepr::Number(value),
        }
    }
}

impl fmt::Display for GradPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradPosition::All => f.write_str("all"),
            GradPosition::Mean => f.write_str("mean"),
            GradPosition::At(value) => f.write_str(&format_float(*value)),
        }
    }
}

/// Which extremum [`crate::results::ResultGrid::thresholds`] looks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Position of the maximum value
    #[default]
    MinMax,
    /// Position of the minimum value
    MinMin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Serial,
    Parallel,
}

/// Raw sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    #[serde(rename = "X", alias = "x", skip_serializing_if = "Option::is_none")]
    pub x: Option<AxisConfig>,
    #[serde(rename = "Y", alias = "y", skip_serializing_if = "Option::is_none")]
    pub y: Option<AxisConfig>,
    #[serde(rename = "Z", alias = "z", skip_serializing_if = "Option::is_none")]
    pub z: Option<AxisConfig>,
    pub grad: bool,
    pub grad_position: GradPosition,
    pub show_progress: bool,
    #[serde(alias = "file_path_prefix", skip_serializing_if = "Option::is_none")]
    pub cache_file_prefix: Option<String>,
    pub prefix_with_system: bool,
    pub threshold_mode: ThresholdMode,
    pub execution_mode: ExecutionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            z: None,
            grad: false,
            grad_position: GradPosition::All,
            show_progress: false,
            cache_file_prefix: None,
            prefix_with_system: true,
            threshold_mode: ThresholdMode::MinMax,
            execution_mode: ExecutionMode::Serial,
            num_workers: None,
        }
    }
}

impl SweepConfig {
    fn axis(&self, axis: AxisId) -> Option<&AxisConfig> {
        match axis {
            AxisId::X => self.x.as_ref(),
            AxisId::Y => self.y.as_ref(),
            AxisId::Z => self.z.as_ref(),
        }
    }
}

/// Options of a resolved sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOptions {
    pub grad: bool,
    pub grad_position: GradPosition,
    pub show_progress: bool,
    pub cache_file_prefix: Option<String>,
    pub prefix_with_system: bool,
    pub threshold_mode: ThresholdMode,
    pub execution_mode: ExecutionMode,
    pub num_workers: Option<usize>,
}

/// Resolved, read-only description of one sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSpec {
    kind: SweepKind,
    x: Axis,
    y: Option<Axis>,
    z: Option<Axis>,
    options: SweepOptions,
}

impl SweepSpec {
    /// Validate `config` for a sweep of the given kind.
    ///
    /// Axes beyond the kind's dimensionality are ignored.
    pub fn build(kind: SweepKind, config: &SweepConfig) -> Result<Self, ConfigError> {
        let resolve = |axis: AxisId| -> Result<Axis, ConfigError> {
            let axis_config = config
                .axis(axis)
                .ok_or(ConfigError::MissingAxis { axis, kind })?;
            Axis::build(axis, axis_config)
        };

        let x = resolve(AxisId::X)?;
        let y = match kind {
            SweepKind::X => None,
            SweepKind::XY | SweepKind::XYZ => Some(resolve(AxisId::Y)?),
        };
        let z = match kind {
            SweepKind::XYZ => Some(resolve(AxisId::Z)?),
            SweepKind::X | SweepKind::XY => None,
        };

        if config.grad && x.dim() < 2 {
            return Err(ConfigError::GradientTooShort { found: x.dim() });
        }

        Ok(Self {
            kind,
            x,
            y,
            z,
            options: SweepOptions {
                grad: config.grad,
                grad_position: config.grad_position,
                show_progress: config.show_progress,
                cache_file_prefix: config.cache_file_prefix.clone(),
                prefix_with_system: config.prefix_with_system,
                threshold_mode: config.threshold_mode,
                execution_mode: config.execution_mode,
                num_workers: config.num_workers,
            },
        })
    }

    pub fn kind(&self) -> SweepKind {
        self.kind
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> Option<&Axis> {
        self.y.as_ref()
    }

    pub fn z(&self) -> Option<&Axis> {
        self.z.as_ref()
    }

    pub fn axis(&self, axis: AxisId) -> Option<&Axis> {
        match axis {
            AxisId::X => Some(&self.x),
            AxisId::Y => self.y.as_ref(),
            AxisId::Z => self.z.as_ref(),
        }
    }

    /// Active axes, innermost first
    pub fn axes(&self) -> impl Iterator<Item = (AxisId, &Axis)> {
        self.kind
            .axes()
            .iter()
            .filter_map(|&id| self.axis(id).map(|axis| (id, axis)))
    }

    pub fn options(&self) -> &SweepOptions {
        &self.options
    }

    /// The outermost axis
    pub fn sliced_axis(&self) -> &Axis {
        self.axis(self.kind.sliced_axis()).unwrap_or(&self.x)
    }

    /// Whether the X dimension is reduced to a single gradient value per row
    pub fn collapses(&self) -> bool {
        self.options.grad
            && self.options.grad_position != GradPosition::All
            && self.kind != SweepKind::X
    }

    /// Shape of the axis dimensions of `V`, outermost first
    pub fn leading_shape(&self) -> Vec<usize> {
        let mut shape: Vec<usize> = self.axes().map(|(_, axis)| axis.dim()).collect();
        if self.collapses() {
            shape.remove(0);
        }
        shape.reverse();
        shape
    }

    /// Copy of this spec with one axis iterating over `values` instead.
    ///
    /// `values` must not be empty.
    pub(crate) fn with_axis_values(&self, axis: AxisId, values: Vec<f64>) -> Self {
        let mut spec = self.clone();
        match axis {
            AxisId::X => spec.x = self.x.with_values(values),
            AxisId::Y => spec.y = self.y.as_ref().map(|y| y.with_values(values)),
            AxisId::Z => spec.z = self.z.as_ref().map(|z| z.with_values(values)),
        }
        spec
    }

    pub(crate) fn options_mut(&mut self) -> &mut SweepOptions {
        &mut self.options
    }
}

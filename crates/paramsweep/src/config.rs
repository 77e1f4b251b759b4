//! Run configuration files
//!
//! A run file names the sweep kind, the model to evaluate, the fixed system
//! parameters and the sweep axes:
//!
//! ```yaml
//! kind: xy
//! model:
//!   type: lorentzian
//!   input: omega
//!   center: omega0
//!   width: 0.2
//! system:
//!   omega0: 1.0
//! sweep:
//!   X: { var: omega, min: 0.0, max: 2.0, dim: 201 }
//!   Y: { var: omega0, min: 0.5, max: 1.5, dim: 11 }
//! ```

use std::path::{Path, PathBuf};

use paramsweep_core::{ConfigError, SweepConfig, SweepKind, SweepSpec, SystemParams};
use serde::{Deserialize, Serialize};

use crate::models::Model;

#[derive(Debug)]
pub enum RunConfigError {
    Io(String),
    Parse(String),
    Invalid(ConfigError),
}

impl std::fmt::Display for RunConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunConfigError::Io(msg) => write!(f, "IO error: {}", msg),
            RunConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            RunConfigError::Invalid(err) => write!(f, "Invalid sweep: {}", err),
        }
    }
}

impl std::error::Error for RunConfigError {}

impl From<ConfigError> for RunConfigError {
    fn from(err: ConfigError) -> Self {
        RunConfigError::Invalid(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub kind: SweepKind,
    pub model: Model,
    #[serde(default)]
    pub system: SystemParams,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl RunConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, RunConfigError> {
        serde_saphyr::from_str(yaml).map_err(|e| RunConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RunConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Place a relative cache prefix under `data_dir`
    pub fn resolve_cache_prefix(&mut self, data_dir: &Path) {
        if let Some(prefix) = &self.sweep.cache_file_prefix {
            let prefix = PathBuf::from(prefix);
            if prefix.is_relative() {
                self.sweep.cache_file_prefix =
                    Some(data_dir.join(prefix).to_string_lossy().into_owned());
            }
        }
    }

    pub fn spec(&self) -> Result<SweepSpec, RunConfigError> {
        Ok(SweepSpec::build(self.kind, &self.sweep)?)
    }
}

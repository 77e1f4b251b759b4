//! Human-readable summary and YAML export of sweep results

use std::path::Path;

use paramsweep_core::{ResultGrid, SweepSpec, Thresholds, format_float};
use serde::Serialize;

/// Everything written by `--output`
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub kind: String,
    pub shape: &'a [usize],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Thresholds>,
    pub results: &'a ResultGrid,
}

impl<'a> RunReport<'a> {
    pub fn new(spec: &SweepSpec, results: &'a ResultGrid) -> Self {
        Self {
            kind: spec.kind().to_string(),
            shape: results.shape(),
            threshold: results.thresholds(spec.options().threshold_mode),
            results,
        }
    }

    pub fn write_yaml(&self, path: &Path) -> color_eyre::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_saphyr::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

/// Short multi-line summary for the terminal
pub fn summarize(spec: &SweepSpec, report: &RunReport<'_>) -> String {
    let axes: Vec<String> = spec
        .axes()
        .map(|(id, axis)| {
            format!(
                "{id}: {} in [{}, {}] ({} points)",
                axis.label(),
                format_float(axis.min()),
                format_float(axis.max()),
                axis.dim()
            )
        })
        .collect();

    let shape: Vec<String> = report.shape.iter().map(usize::to_string).collect();
    let mut lines = vec![
        format!("{} sweep", report.kind),
        axes.join("\n"),
        format!("shape: ({})", shape.join(", ")),
    ];

    match report.threshold {
        Some(threshold) => {
            let mut at = vec![format!("x={}", format_float(threshold.x))];
            at.extend(threshold.y.map(|y| format!("y={}", format_float(y))));
            at.extend(threshold.z.map(|z| format!("z={}", format_float(z))));
            lines.push(format!(
                "threshold: {} at {}",
                format_float(threshold.value),
                at.join(", ")
            ));
        }
        None => lines.push("threshold: none (all values are NaN)".to_string()),
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use paramsweep_core::{AxisConfig, SweepConfig, SweepKind, SystemParams, run};

    use crate::models::{Model, Operand};

    fn xy_spec() -> SweepSpec {
        let config = SweepConfig {
            x: Some(AxisConfig::values("x", vec![0.0, 1.0, 2.0])),
            y: Some(AxisConfig::values("y", vec![1.0, 2.0])),
            ..SweepConfig::default()
        };
        SweepSpec::build(SweepKind::XY, &config).unwrap()
    }

    fn product() -> Model {
        Model::Product {
            factors: vec![
                Operand::Param("x".to_string()),
                Operand::Param("y".to_string()),
            ],
        }
    }

    #[test]
    fn test_summary_lists_axes_and_maximum() {
        let spec = xy_spec();
        let results = run(&spec, &product(), &SystemParams::new()).unwrap();
        let report = RunReport::new(&spec, &results);

        let summary = summarize(&spec, &report);
        assert_eq!(
            summary,
            "XY sweep\n\
             X: x in [0.0, 2.0] (3 points)\n\
             Y: y in [1.0, 2.0] (2 points)\n\
             shape: (2, 3)\n\
             threshold: 4.0 at x=2.0, y=2.0"
        );
    }

    #[test]
    fn test_write_yaml_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let spec = xy_spec();
        let results = run(&spec, &product(), &SystemParams::new()).unwrap();
        let path = dir.path().join("out/results.yaml");

        RunReport::new(&spec, &results).write_yaml(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("kind: XY"));
        assert!(written.contains("threshold:"));
    }
}

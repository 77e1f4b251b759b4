//! Tests for parallel execution
//!
//! These tests verify:
//! - Parallel runs reproduce serial results for every sweep kind
//! - 1D gradients are unaffected by slice boundaries
//! - Worker failures abort the run without caching
//! - Parallel runs share the cache with serial runs

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{build, positional, square_roots, xy_config};
use crate::axis::AxisConfig;
use crate::cache;
use crate::config::{ExecutionMode, GradPosition, SweepConfig, SweepKind};
use crate::error::{EvaluateError, SweepError};
use crate::parallel::Partition;
use crate::params::SystemParams;
use crate::results::ResultGrid;
use crate::runner::run;

fn parallel(config: SweepConfig, workers: usize) -> SweepConfig {
    SweepConfig {
        execution_mode: ExecutionMode::Parallel,
        num_workers: Some(workers),
        ..config
    }
}

fn assert_same(serial: &ResultGrid, parallel: &ResultGrid) {
    assert!(
        serial.v.bits_eq(&parallel.v),
        "serial {:?} != parallel {:?}",
        serial.v,
        parallel.v
    );
    assert_eq!(serial.x, parallel.x);
    assert_eq!(serial.y, parallel.y);
    assert_eq!(serial.z, parallel.z);
}

/// Ten Y points over three workers match a single-process run
#[test]
fn test_xy_parallel_matches_serial() {
    let partition = Partition::new(10, 3);
    assert_eq!(partition.slice_dim(), 4);
    assert_eq!(partition.ranges(), vec![0..4, 4..8, 8..10]);

    let config = xy_config(5, 10);
    let params = SystemParams::new();
    let serial = run(&build(SweepKind::XY, config.clone()), &positional, &params).unwrap();
    let parallel = run(&build(SweepKind::XY, parallel(config, 3)), &positional, &params).unwrap();

    assert_eq!(parallel.v.shape(), &[10, 5]);
    assert_same(&serial, &parallel);
}

#[test]
fn test_x_parallel_gradient_matches_serial() {
    let cubic = |params: &SystemParams| -> Result<f64, EvaluateError> {
        Ok(params.number("x")?.powi(3))
    };
    let config = SweepConfig {
        x: Some(AxisConfig::range("x", -1.0, 1.0, 23)),
        grad: true,
        ..SweepConfig::default()
    };
    let params = SystemParams::new();
    let serial = run(&build(SweepKind::X, config.clone()), &cubic, &params).unwrap();
    let parallel = run(&build(SweepKind::X, parallel(config, 4)), &cubic, &params).unwrap();

    assert_same(&serial, &parallel);
}

#[test]
fn test_xyz_collapse_parallel_matches_serial() {
    let config = SweepConfig {
        z: Some(AxisConfig::range("z", 0.0, 0.5, 6)),
        grad: true,
        grad_position: GradPosition::At(2.0),
        ..xy_config(4, 3)
    };
    let params = SystemParams::new();
    let serial = run(&build(SweepKind::XYZ, config.clone()), &positional, &params).unwrap();
    let parallel = run(&build(SweepKind::XYZ, parallel(config, 3)), &positional, &params).unwrap();

    assert_eq!(parallel.v.shape(), &[6, 3]);
    assert_same(&serial, &parallel);
}

#[test]
fn test_ragged_parallel_matches_serial() {
    let config = SweepConfig {
        x: Some(AxisConfig::range("x", -2.0, 2.0, 9)),
        ..SweepConfig::default()
    };
    let params = SystemParams::new();
    let serial = run(&build(SweepKind::X, config.clone()), &square_roots, &params).unwrap();
    let parallel = run(&build(SweepKind::X, parallel(config, 3)), &square_roots, &params).unwrap();

    assert_eq!(parallel.v.shape(), &[9, 2]);
    assert_same(&serial, &parallel);
}

#[test]
fn test_worker_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = SweepConfig {
        cache_file_prefix: Some(dir.path().join("V").to_string_lossy().into_owned()),
        ..parallel(xy_config(3, 8), 3)
    };
    let spec = build(SweepKind::XY, config);
    let params = SystemParams::new();

    let failing = |params: &SystemParams| -> Result<f64, EvaluateError> {
        if params.number("y")? >= 8.0 {
            return Err(EvaluateError::new("diverged"));
        }
        positional(params)
    };
    let err = run(&spec, &failing, &params).unwrap_err();

    match err {
        SweepError::Worker { source, .. } => {
            assert!(matches!(*source, SweepError::Evaluate { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    let path = cache::path_for(&spec, &params).unwrap();
    assert!(!cache::exists(&path).unwrap());
}

#[test]
fn test_parallel_run_uses_and_fills_cache() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("V").to_string_lossy().into_owned();
    let params = SystemParams::new();

    let calls = AtomicUsize::new(0);
    let counted = |params: &SystemParams| -> Result<f64, EvaluateError> {
        calls.fetch_add(1, Ordering::Relaxed);
        positional(params)
    };

    let parallel_spec = build(
        SweepKind::XY,
        SweepConfig {
            cache_file_prefix: Some(prefix.clone()),
            ..parallel(xy_config(3, 6), 2)
        },
    );
    let first = run(&parallel_spec, &counted, &params).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 18);

    // Execution mode is not part of the key, so a serial run reuses it
    let serial_spec = build(
        SweepKind::XY,
        SweepConfig {
            cache_file_prefix: Some(prefix),
            ..xy_config(3, 6)
        },
    );
    let second = run(&serial_spec, &counted, &params).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 18);
    assert_same(&first, &second);
}

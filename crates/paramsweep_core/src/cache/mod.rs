//! On-disk result cache.
//!
//! Each sweep is stored as `<key>.npz`, a deflated zip archive holding the
//! values as a single `arr_0.npy` entry. Only `V` is persisted; coordinates
//! are rebuilt from the [`SweepSpec`] on load. Uncompressed `<key>.npy`
//! files from older runs are migrated to the archive format on first access.

pub mod npy;

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::config::{GradPosition, SweepSpec};
use crate::error::{CacheError, Result};
use crate::grid::SweepGrid;
use crate::params::{SystemParams, format_float};
use crate::results::ResultGrid;

/// Extension of cache archives
pub const ARCHIVE_EXTENSION: &str = "npz";
/// Extension of uncompressed legacy cache files
pub const LEGACY_EXTENSION: &str = "npy";
/// Name of the array entry inside an archive
pub const ARRAY_ENTRY: &str = "arr_0.npy";

/// Cache key of a sweep, `None` when caching is disabled.
///
/// The key is the configured prefix followed by the system parameter values
/// (in insertion order, unless disabled), one `_<axis>=<var>[_<idx>]_<min>_<max>_<dim>`
/// block per active axis, and a gradient marker.
pub fn path_for(spec: &SweepSpec, params: &SystemParams) -> Option<PathBuf> {
    let options = spec.options();
    let mut key = options.cache_file_prefix.clone()?;

    if options.prefix_with_system {
        for value in params.values() {
            key.push('_');
            key.push_str(&value.to_string());
        }
    }

    for (id, axis) in spec.axes() {
        key.push_str(&format!("_{}={}", id.key(), axis.var()));
        if let Some(idx) = axis.idx() {
            key.push_str(&format!("_{idx}"));
        }
        key.push_str(&format!(
            "_{}_{}_{}",
            format_float(axis.min()),
            format_float(axis.max()),
            axis.dim()
        ));
    }

    if options.grad {
        match options.grad_position {
            GradPosition::All => key.push_str("_grad"),
            position => key.push_str(&format!("_grad={position}")),
        }
    }

    Some(PathBuf::from(key))
}

/// `path` with `.extension` appended (keys may contain dots)
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Whether a cached result exists for `path`.
///
/// A legacy `.npy` file is converted to an archive and reported as existing.
pub fn exists(path: &Path) -> std::result::Result<bool, CacheError> {
    if with_extension(path, ARCHIVE_EXTENSION).is_file() {
        return Ok(true);
    }

    let legacy = with_extension(path, LEGACY_EXTENSION);
    if legacy.is_file() {
        let values = npy::decode(&fs::read(&legacy)?)?;
        save(path, &values)?;
        info!(path = %legacy.display(), "Migrated legacy cache file");
        return Ok(true);
    }
    Ok(false)
}

/// Read the values stored for `path`
pub fn load(path: &Path) -> std::result::Result<SweepGrid<f64>, CacheError> {
    let file = File::open(with_extension(path, ARCHIVE_EXTENSION))?;
    let mut archive = zip::ZipArchive::new(file)?;

    // Archives written under another entry name still hold a single array
    let index = match archive.index_for_name(ARRAY_ENTRY) {
        Some(index) => index,
        None if archive.len() > 0 => 0,
        None => return Err(zip::result::ZipError::FileNotFound.into()),
    };

    let mut bytes = Vec::new();
    archive.by_index(index)?.read_to_end(&mut bytes)?;
    npy::decode(&bytes)
}

/// Store `values` for `path`, creating parent directories as needed.
///
/// The archive is written next to its final location and renamed into
/// place, so readers never observe a partial file.
pub fn save(path: &Path, values: &SweepGrid<f64>) -> std::result::Result<(), CacheError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            debug!(dir = %parent.display(), "Creating cache directory");
        }
        fs::create_dir_all(parent)?;
    }

    let target = with_extension(path, ARCHIVE_EXTENSION);
    let partial = with_extension(path, "npz.partial");

    let file = File::create(&partial)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(ARRAY_ENTRY, options)?;
    zip.write_all(&npy::encode(values))?;
    zip.finish()?;

    fs::rename(&partial, &target)?;
    debug!(path = %target.display(), shape = ?values.shape(), "Saved cache file");
    Ok(())
}

/// Cached results for `spec`, if present.
///
/// Loaded values whose leading dimensions disagree with the sweep axes are an
/// error rather than a silent misalignment.
pub(crate) fn load_results(spec: &SweepSpec, path: &Path) -> Result<Option<ResultGrid>> {
    if !exists(path)? {
        debug!(path = %path.display(), "Cache miss");
        return Ok(None);
    }
    let values = load(path)?;
    info!(path = %path.display(), shape = ?values.shape(), "Cache hit");
    ResultGrid::assemble_cached(spec, values, path).map(Some)
}

//! Input discovery and output naming.

use crate::bounds::PointBounds;
use crate::constants::{OUTPUT_PREFIX, POINT_CLOUD_PATTERNS};
use crate::error::{DsmError, Result};
use crate::laz::{HeaderSummary, read_header};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Recursively collect point cloud files under `root`, sorted by path.
/// A file matches when its lower-cased name contains `.las` or `.laz`.
pub fn find_point_clouds(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(DsmError::MissingInput(root.to_path_buf()));
    }
    info!("Finding point cloud files in {}", root.display());

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        if dir.is_file() {
            if is_point_cloud(&dir) {
                found.push(dir);
            }
            continue;
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_point_cloud(&path) {
                debug!("Found {}", path.display());
                found.push(path);
            }
        }
    }

    found.sort();
    info!("Found {} point cloud file(s)", found.len());
    Ok(found)
}

fn is_point_cloud(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| POINT_CLOUD_PATTERNS.iter().any(|p| name.contains(p)))
}

/// Header totals over a set of files.
#[derive(Debug, Clone)]
pub struct CloudSummary {
    pub files: Vec<HeaderSummary>,
    /// Files whose header could not be read.
    pub unreadable: Vec<PathBuf>,
    pub total_points: u64,
    pub bounds: PointBounds,
}

/// Read every header in parallel and combine counts and extents.
/// Unreadable headers are logged and left out of the totals.
pub fn summarize(files: &[PathBuf]) -> CloudSummary {
    let results: Vec<(&PathBuf, Result<HeaderSummary>)> = files
        .par_iter()
        .map(|path| (path, read_header(path)))
        .collect();

    let mut headers = Vec::with_capacity(results.len());
    let mut unreadable = Vec::new();
    for (path, result) in results {
        match result {
            Ok(header) => headers.push(header),
            Err(e) => {
                warn!("Skipping header of {}: {e}", path.display());
                unreadable.push(path.clone());
            }
        }
    }

    let total_points = headers.iter().map(|h| h.point_count).sum();
    let bounds = headers
        .iter()
        .fold(PointBounds::new(), |bounds, h| bounds.merge(&h.bounds));

    CloudSummary {
        files: headers,
        unreadable,
        total_points,
        bounds,
    }
}

/// Whether outputs are named after each input or after the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One raster per input file.
    File,
    /// One raster for everything under a directory.
    Directory,
}

/// Output stem (path without channel suffix) for `input`.
///
/// The directory comes from `out` when it names one, otherwise from the
/// input's directory. In [`OutputMode::File`] the name is the stem of
/// `out`'s file name, or `PointDensity_<input stem>` when `out` has none.
/// In [`OutputMode::Directory`] the name is always `PointDensity`.
pub fn resolve_output_stem(out: &Path, input: &Path, mode: OutputMode) -> PathBuf {
    let (out_dir, out_name) = split_output(out);
    let dir = out_dir.unwrap_or_else(|| {
        input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });

    let name = match mode {
        OutputMode::File => out_name.unwrap_or_else(|| {
            let stem = input
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            format!("{OUTPUT_PREFIX}_{stem}")
        }),
        OutputMode::Directory => OUTPUT_PREFIX.to_string(),
    };
    dir.join(name)
}

/// Split a user supplied output path into directory and file stem. A path
/// ending in a separator, or naming an existing directory, has no file part.
fn split_output(out: &Path) -> (Option<PathBuf>, Option<String>) {
    let raw = out.to_string_lossy();
    if raw.is_empty() {
        return (None, None);
    }
    if raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR) || out.is_dir() {
        return (Some(out.to_path_buf()), None);
    }

    let dir = out
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf);
    let name = out
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string());
    (dir, name)
}

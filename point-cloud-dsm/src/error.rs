//! Error type shared by the rasterisation core and its adapters.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DsmError>;

#[derive(Error, Debug)]
pub enum DsmError {
    /// Cell size must be a finite positive number.
    #[error("Invalid cell size {0}: must be finite and greater than zero")]
    InvalidCellSize(f64),

    /// At least one worker is needed to run a pipeline.
    #[error("Invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),

    /// A point source was asked for an index it does not hold.
    #[error("Point index {index} out of bounds for source with {len} points")]
    PointIndexOutOfBounds { index: usize, len: usize },

    /// One of a worker's stage threads panicked.
    #[error("Worker {worker} panicked during rasterisation")]
    WorkerPanicked { worker: usize },

    /// The computed grid has no cells, so there is nothing to encode.
    #[error("Grid for {} has no cells (width {width}, height {height})", .input.display())]
    EmptyGrid {
        input: PathBuf,
        width: usize,
        height: usize,
    },

    /// Bounds and cell size give more cells than can be addressed.
    #[error("Grid of {width}x{height} cells is too large to index")]
    GridTooLarge { width: usize, height: usize },

    #[error("Input does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LAS error: {0}")]
    Las(#[from] las::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Progress template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),
}

//! Point cloud to Digital Surface Model rasterisation.
//!
//! Points are split into contiguous index ranges, each range is binned by
//! its own three stage pipeline into a private grid that keeps the highest
//! point per cell, and the private grids are merged into one raster. The
//! LAS reader, TIFF writer and discovery helpers sit around that core.

pub mod bounds;
pub mod cell_store;
pub mod constants;
pub mod converter;
pub mod discovery;
pub mod error;
pub mod geometry;
pub mod laz;
pub mod manifest;
pub mod pipeline;
pub mod point;
pub mod rasterizer;
pub mod source;
pub mod tiff_writer;

pub use bounds::PointBounds;
pub use converter::DsmConverter;
pub use error::{DsmError, Result};
pub use geometry::GridGeometry;
pub use point::Point;
pub use rasterizer::{Raster, RasterConfig, Rasterizer, RunStats, rasterize};
pub use source::{ChainedPointSource, PointSource, VecPointSource};

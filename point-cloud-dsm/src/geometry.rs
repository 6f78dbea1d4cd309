//! Mapping from continuous planar coordinates to flat raster cell indices.

use crate::bounds::PointBounds;
use crate::error::{DsmError, Result};
use serde::{Deserialize, Serialize};

/// Regular grid anchored at the lower-left corner of a bounding box.
///
/// Cells are addressed row-major with row 0 at the lowest y, so the flat
/// index of a coordinate is `floor((x - origin_x) / cell_size) +
/// floor((y - origin_y) / cell_size) * width`. Every worker of a run holds
/// an identical copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    origin_x: f64,
    origin_y: f64,
    cell_size: f64,
    width: usize,
    height: usize,
    cell_count: usize,
}

impl GridGeometry {
    /// Derive a grid covering `bounds` with square cells of `cell_size`.
    /// Each axis gets `ceil(extent / cell_size)` cells; an empty or inverted
    /// extent yields zero cells on that axis. Fails with
    /// [`DsmError::GridTooLarge`] when the cell count cannot be indexed.
    pub fn new(bounds: &PointBounds, cell_size: f64) -> Result<Self> {
        validate_cell_size(cell_size)?;

        let width = axis_cells(bounds.max_x - bounds.min_x, cell_size);
        let height = axis_cells(bounds.max_y - bounds.min_y, cell_size);
        // Flat indices are computed as i64, so the count must fit there too.
        let cell_count = width
            .checked_mul(height)
            .filter(|&count| i64::try_from(count).is_ok())
            .ok_or(DsmError::GridTooLarge { width, height })?;

        Ok(Self {
            origin_x: bounds.min_x,
            origin_y: bounds.min_y,
            cell_size,
            width,
            height,
            cell_count,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Lower-left world coordinate of cell 0.
    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Raw flat index for a coordinate. Not bounds checked: the result may be
    /// negative or past the last cell, and a column past the right edge wraps
    /// into the next row.
    #[inline]
    pub fn cell_index(&self, x: f64, y: f64) -> i64 {
        let col = ((x - self.origin_x) / self.cell_size).floor() as i64;
        let row = ((y - self.origin_y) / self.cell_size).floor() as i64;
        col.saturating_add(row.saturating_mul(self.width as i64))
    }

    /// Flat index of the cell holding `(x, y)`, or `None` when the index
    /// falls outside `0..cell_count()`. Non-finite coordinates never map.
    #[inline]
    pub fn locate(&self, x: f64, y: f64) -> Option<usize> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let index = self.cell_index(x, y);
        if self.contains(index) {
            Some(index as usize)
        } else {
            None
        }
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= 0 && (index as u64) < self.cell_count() as u64
    }

    /// World file coefficients: pixel width, two rotation terms, negative
    /// pixel height, then the centre of the upper-left pixel.
    pub fn world_transform(&self) -> [f64; 6] {
        let gap = self.cell_size;
        [
            gap,
            0.0,
            0.0,
            -gap,
            self.origin_x + gap / 2.0,
            self.origin_y + gap * (self.height as f64 - 0.5),
        ]
    }
}

pub(crate) fn validate_cell_size(cell_size: f64) -> Result<()> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(DsmError::InvalidCellSize(cell_size))
    }
}

fn axis_cells(extent: f64, cell_size: f64) -> usize {
    let cells = (extent / cell_size).ceil();
    if cells.is_finite() && cells > 0.0 {
        cells as usize
    } else {
        0
    }
}

//! Random-access point sources consumed by the rasteriser.

use crate::bounds::PointBounds;
use crate::error::{DsmError, Result};
use crate::point::Point;

/// Indexable collection of points.
///
/// Producers of different workers call `point_at` concurrently on disjoint
/// index ranges, hence the `Sync` bound.
pub trait PointSource: Sync {
    fn total_point_count(&self) -> usize;

    /// Planar extent the grid is laid over.
    fn bounding_box(&self) -> PointBounds;

    fn point_at(&self, index: usize) -> Result<Point>;
}

/// Points held in memory, with bounds computed on construction unless given.
#[derive(Debug, Clone)]
pub struct VecPointSource {
    points: Vec<Point>,
    bounds: PointBounds,
}

impl VecPointSource {
    pub fn new(points: Vec<Point>) -> Self {
        let bounds = points.iter().fold(PointBounds::new(), |mut bounds, p| {
            bounds.update(p.x, p.y, p.z);
            bounds
        });
        Self { points, bounds }
    }

    /// Use a caller supplied extent, e.g. a file header, instead of the
    /// extent of the points themselves.
    pub fn with_bounds(points: Vec<Point>, bounds: PointBounds) -> Self {
        Self { points, bounds }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

impl PointSource for VecPointSource {
    fn total_point_count(&self) -> usize {
        self.points.len()
    }

    fn bounding_box(&self) -> PointBounds {
        self.bounds
    }

    fn point_at(&self, index: usize) -> Result<Point> {
        self.points
            .get(index)
            .copied()
            .ok_or(DsmError::PointIndexOutOfBounds {
                index,
                len: self.points.len(),
            })
    }
}

/// Several sources addressed as one contiguous index space, in order.
/// The bounding box is the union of the parts.
pub struct ChainedPointSource<S> {
    parts: Vec<S>,
    /// Exclusive end index of each part in the combined space.
    ends: Vec<usize>,
}

impl<S: PointSource> ChainedPointSource<S> {
    pub fn new(parts: Vec<S>) -> Self {
        let ends = parts
            .iter()
            .scan(0usize, |end, part| {
                *end += part.total_point_count();
                Some(*end)
            })
            .collect();
        Self { parts, ends }
    }

    pub fn parts(&self) -> &[S] {
        &self.parts
    }
}

impl<S: PointSource> PointSource for ChainedPointSource<S> {
    fn total_point_count(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    fn bounding_box(&self) -> PointBounds {
        self.parts
            .iter()
            .fold(PointBounds::new(), |bounds, part| {
                bounds.merge(&part.bounding_box())
            })
    }

    fn point_at(&self, index: usize) -> Result<Point> {
        // First part whose end lies beyond the index.
        let part = self.ends.partition_point(|&end| end <= index);
        let Some(part_source) = self.parts.get(part) else {
            return Err(DsmError::PointIndexOutOfBounds {
                index,
                len: self.total_point_count(),
            });
        };
        let start = if part == 0 { 0 } else { self.ends[part - 1] };
        part_source.point_at(index - start)
    }
}

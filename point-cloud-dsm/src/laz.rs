//! LAS/LAZ point source adapter.
use crate::bounds::PointBounds;
use crate::constants::PROGRESS_UPDATE_INTERVAL;
use crate::error::Result;
use crate::point::Point;
use crate::source::{PointSource, VecPointSource};
use indicatif::{ProgressBar, ProgressStyle};
use las::Reader;
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub fn create_reader(file_path: &Path) -> Result<Reader> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

impl From<las::Bounds> for PointBounds {
    fn from(bounds: las::Bounds) -> Self {
        Self {
            min_x: bounds.min.x,
            max_x: bounds.max.x,
            min_y: bounds.min.y,
            max_y: bounds.max.y,
            min_z: bounds.min.z,
            max_z: bounds.max.z,
        }
    }
}

/// Point count and extent as recorded in a file header.
#[derive(Debug, Clone)]
pub struct HeaderSummary {
    pub path: PathBuf,
    pub point_count: u64,
    pub bounds: PointBounds,
}

/// Read only the header of a point cloud file.
pub fn read_header(file_path: &Path) -> Result<HeaderSummary> {
    let reader = create_reader(file_path)?;
    let header = reader.header();
    Ok(HeaderSummary {
        path: file_path.to_path_buf(),
        point_count: header.number_of_points(),
        bounds: header.bounds().into(),
    })
}

/// A whole LAS/LAZ file decoded into memory.
///
/// The grid is laid over the header bounds, matching what the file claims
/// to cover. Each point's label is its point source ID.
pub struct LasPointSource {
    path: PathBuf,
    inner: VecPointSource,
}

impl LasPointSource {
    pub fn open(file_path: &Path, show_progress: bool) -> Result<Self> {
        let mut reader = create_reader(file_path)?;
        let total_points = reader.header().number_of_points() as usize;
        let bounds = PointBounds::from(reader.header().bounds());

        let pb = if show_progress {
            let pb = ProgressBar::new(total_points as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {pos}/{len} points ({percent}%) {msg}")?
                    .progress_chars("▉▊▋▌▍▎▏ "),
            );
            pb.set_message("Loading points");
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut points = Vec::with_capacity(total_points);
        for (idx, point_result) in reader.points().enumerate() {
            let point = point_result?;
            points.push(Point::new(
                point.x,
                point.y,
                point.z,
                u32::from(point.point_source_id),
            ));

            if idx % PROGRESS_UPDATE_INTERVAL == 0 {
                pb.set_position(idx as u64);
            }
        }
        pb.finish_with_message("Points loaded");

        Ok(Self {
            path: file_path.to_path_buf(),
            inner: VecPointSource::with_bounds(points, bounds),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PointSource for LasPointSource {
    fn total_point_count(&self) -> usize {
        self.inner.total_point_count()
    }

    fn bounding_box(&self) -> PointBounds {
        self.inner.bounding_box()
    }

    fn point_at(&self, index: usize) -> Result<Point> {
        self.inner.point_at(index)
    }
}

/// Log header information for debugging.
/// Reports version, point format, scale factors and offsets.
pub fn log_file_info(file_path: &Path) -> Result<()> {
    let reader = create_reader(file_path)?;
    let header = reader.header();
    let transforms = header.transforms();

    info!("LAS/LAZ file information:");
    info!("  File: {}", file_path.display());
    info!(
        "  Version: {}.{}",
        header.version().major,
        header.version().minor
    );
    info!("  Points: {}", header.number_of_points());
    info!("  Point format: {:?}", header.point_format().to_u8());
    info!(
        "  Scale factors: X={}, Y={}, Z={}",
        transforms.x.scale, transforms.y.scale, transforms.z.scale
    );
    info!(
        "  Offsets: X={}, Y={}, Z={}",
        transforms.x.offset, transforms.y.offset, transforms.z.offset
    );
    Ok(())
}

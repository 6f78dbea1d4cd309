//! Run metadata written next to the rasters for downstream tooling.
use crate::constants::METADATA_SUFFIX;
use crate::error::Result;
use crate::rasterizer::{Raster, RunStats};
use crate::tiff_writer::{WrittenChannel, with_suffix};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Grid placement, copied out of the geometry for serialisation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GridInfo {
    pub width: usize,
    pub height: usize,
    pub cell_size: f64,
    pub origin: [f64; 2],
    /// Coefficients as written to the world files.
    pub world_transform: [f64; 6],
}

/// Paths of the files written for this run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutputFiles {
    pub dsm: PathBuf,
    pub dsm_world_file: PathBuf,
    pub label: PathBuf,
    pub label_world_file: PathBuf,
}

/// Everything known about one finished conversion.
#[derive(Serialize, Debug, Clone)]
pub struct RunMetadata {
    pub inputs: Vec<PathBuf>,
    pub grid: GridInfo,
    pub stats: RunStats,
    /// `[min, max]` over filled cells, absent when nothing landed.
    pub elevation_range: Option<[f64; 2]>,
    pub outputs: OutputFiles,
}

impl RunMetadata {
    pub fn new(
        inputs: Vec<PathBuf>,
        raster: &Raster,
        dsm: &WrittenChannel,
        label: &WrittenChannel,
    ) -> Self {
        let geometry = raster.geometry();
        let (origin_x, origin_y) = geometry.origin();

        Self {
            inputs,
            grid: GridInfo {
                width: geometry.width(),
                height: geometry.height(),
                cell_size: geometry.cell_size(),
                origin: [origin_x, origin_y],
                world_transform: geometry.world_transform(),
            },
            stats: *raster.stats(),
            elevation_range: raster.elevation_range().map(|(lo, hi)| [lo, hi]),
            outputs: OutputFiles {
                dsm: dsm.image.clone(),
                dsm_world_file: dsm.world_file.clone(),
                label: label.image.clone(),
                label_world_file: label.world_file.clone(),
            },
        }
    }

    /// Save as pretty JSON to `<stem>_metadata.json`.
    pub fn save(&self, stem: &Path) -> Result<PathBuf> {
        let path = with_suffix(stem, METADATA_SUFFIX);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::PointBounds;
    use crate::point::Point;
    use crate::rasterizer::{RasterConfig, rasterize};
    use crate::source::VecPointSource;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_json_contents() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("run");
        let source = VecPointSource::with_bounds(
            vec![
                Point::new(0.5, 0.5, 2.0, 1),
                Point::new(1.5, 0.5, 6.0, 2),
                Point::new(9.0, 9.0, 1.0, 3),
            ],
            PointBounds::from_xy(0.0, 0.0, 2.0, 1.0),
        );
        let raster = rasterize(&source, RasterConfig::new(1.0, 2)).unwrap();
        let channel = WrittenChannel {
            image: PathBuf::from("run_dsm.tiff"),
            world_file: PathBuf::from("run_dsm.tfw"),
        };

        let metadata = RunMetadata::new(vec![PathBuf::from("a.las")], &raster, &channel, &channel);
        let path = metadata.save(&stem).unwrap();
        assert_eq!(path, dir.path().join("run_metadata.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["grid"]["width"], 2);
        assert_eq!(json["grid"]["height"], 1);
        assert_eq!(json["stats"]["total_points"], 3);
        assert_eq!(json["stats"]["committed_points"], 2);
        assert_eq!(json["stats"]["discarded_points"], 1);
        assert_eq!(json["elevation_range"][1], 6.0);
        assert_eq!(json["outputs"]["dsm"], "run_dsm.tiff");
    }
}

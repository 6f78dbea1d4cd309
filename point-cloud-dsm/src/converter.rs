//! Point cloud to DSM converter tying sources, rasteriser and writers together.
use crate::bounds::PointBounds;
use crate::discovery::{OutputMode, resolve_output_stem};
use crate::error::{DsmError, Result};
use crate::geometry::GridGeometry;
use crate::laz::{LasPointSource, log_file_info, read_header};
use crate::manifest::RunMetadata;
use crate::rasterizer::{Raster, RasterConfig, Rasterizer};
use crate::source::{ChainedPointSource, PointSource};
use crate::tiff_writer::{write_dsm, write_labels};
use log::{error, info};
use std::path::{Path, PathBuf};

/// Converts LAS/LAZ input into DSM and label rasters.
pub struct DsmConverter {
    /// Cell size and worker count for every run.
    config: RasterConfig,
    /// Draw progress bars while loading and binning.
    show_progress: bool,
}

impl DsmConverter {
    /// Create a converter, rejecting invalid settings up front.
    pub fn new(config: RasterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Rasterise one file and write `<stem>_dsm.*`, `<stem>_label.*` and
    /// `<stem>_metadata.json`. The grid is checked against the header
    /// before any point is loaded.
    pub fn convert(&self, input: &Path, stem: &Path) -> Result<RunMetadata> {
        info!("Calculating {}", input.display());
        info!("Output stem {}", stem.display());

        log_file_info(input)?;
        let geometry = self.grid_for(&read_header(input)?.bounds, input)?;
        let source = LasPointSource::open(input, self.show_progress)?;
        let raster = self.rasterize(&source, geometry)?;
        self.save(vec![input.to_path_buf()], &raster, stem)
    }

    /// Rasterise several files onto one grid covering all of them.
    pub fn convert_merged(&self, inputs: &[PathBuf], stem: &Path) -> Result<RunMetadata> {
        info!(
            "Merging {} file(s) into {}",
            inputs.len(),
            stem.display()
        );

        let mut bounds = PointBounds::new();
        for path in inputs {
            bounds = bounds.merge(&read_header(path)?.bounds);
        }
        let first = inputs.first().map(PathBuf::as_path).unwrap_or(stem);
        let geometry = self.grid_for(&bounds, first)?;

        let sources = inputs
            .iter()
            .map(|path| LasPointSource::open(path, self.show_progress))
            .collect::<Result<Vec<_>>>()?;
        let source = ChainedPointSource::new(sources);
        let raster = self.rasterize(&source, geometry)?;
        self.save(inputs.to_vec(), &raster, stem)
    }

    /// Convert each file on its own grid next to `out`. A failing file is
    /// logged and does not stop the others; results follow `inputs` order.
    pub fn convert_each(&self, inputs: &[PathBuf], out: &Path) -> Vec<Result<RunMetadata>> {
        inputs
            .iter()
            .map(|path| {
                let stem = resolve_output_stem(out, path, OutputMode::File);
                let result = self.convert(path, &stem);
                if let Err(e) = &result {
                    error!("Failed to convert {}: {e}", path.display());
                }
                result
            })
            .collect()
    }

    /// Grid over `bounds`, refusing one with no cells to encode.
    fn grid_for(&self, bounds: &PointBounds, input: &Path) -> Result<GridGeometry> {
        let geometry = GridGeometry::new(bounds, self.config.cell_size)?;
        if geometry.cell_count() == 0 {
            return Err(DsmError::EmptyGrid {
                input: input.to_path_buf(),
                width: geometry.width(),
                height: geometry.height(),
            });
        }
        Ok(geometry)
    }

    fn rasterize<S>(&self, source: &S, geometry: GridGeometry) -> Result<Raster>
    where
        S: PointSource + ?Sized,
    {
        let raster = Rasterizer::new(self.config)?
            .with_progress(self.show_progress)
            .run_with_geometry(source, geometry)?;

        let stats = raster.stats();
        info!(
            "Grid {}x{}: {} of {} points binned, {} outside the grid, {} cells filled",
            geometry.width(),
            geometry.height(),
            stats.committed_points,
            stats.total_points,
            stats.discarded_points,
            stats.filled_cells
        );
        Ok(raster)
    }

    fn save(&self, inputs: Vec<PathBuf>, raster: &Raster, stem: &Path) -> Result<RunMetadata> {
        if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let dsm = write_dsm(stem, raster)?;
        let label = write_labels(stem, raster)?;
        let metadata = RunMetadata::new(inputs, raster, &dsm, &label);
        metadata.save(stem)?;
        Ok(metadata)
    }
}

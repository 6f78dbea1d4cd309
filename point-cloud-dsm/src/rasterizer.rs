//! Orchestration: partition the source, run one pipeline per partition and
//! merge the private grids into the final surface model.

use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CELL_SIZE, STAGES_PER_WORKER};
use crate::error::{DsmError, Result};
use crate::geometry::{GridGeometry, validate_cell_size};
use crate::pipeline::{Partition, Worker, WorkerHandles, WorkerTally};
use crate::point::Point;
use crate::source::PointSource;

/// Parameters of a rasterisation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Square cell edge length in world units.
    pub cell_size: f64,
    /// Number of independent worker pipelines.
    pub workers: usize,
}

impl RasterConfig {
    pub fn new(cell_size: f64, workers: usize) -> Self {
        Self { cell_size, workers }
    }

    pub fn validate(&self) -> Result<()> {
        validate_cell_size(self.cell_size)?;
        if self.workers == 0 {
            return Err(DsmError::InvalidWorkerCount(self.workers));
        }
        Ok(())
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            workers: 1,
        }
    }
}

/// Worker count for a machine with `cpu_count` logical CPUs. Each worker
/// keeps two stages busy, so half the CPUs, never fewer than one.
pub fn default_worker_count(cpu_count: usize) -> usize {
    (cpu_count / STAGES_PER_WORKER).max(1)
}

/// Split `[0, total)` into `workers` contiguous ranges of `total / workers`
/// points; the last range also takes the remainder.
pub fn partition_ranges(total: usize, workers: usize) -> Vec<Partition> {
    if workers == 0 {
        return Vec::new();
    }
    let step = total / workers;
    (0..workers)
        .map(|i| {
            let start = step * i;
            let end = if i + 1 == workers { total } else { step * (i + 1) };
            Partition::new(start, end)
        })
        .collect()
}

/// Counters describing a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_points: usize,
    pub committed_points: usize,
    pub discarded_points: usize,
    pub filled_cells: usize,
    pub workers: usize,
}

/// Merged grid together with the geometry needed to georeference it.
#[derive(Debug, Clone)]
pub struct Raster {
    points: Vec<Point>,
    geometry: GridGeometry,
    stats: RunStats,
}

impl Raster {
    /// Winning point per cell, row-major with row 0 at the lowest y.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn get(&self, col: usize, row: usize) -> Option<&Point> {
        if col >= self.geometry.width() {
            return None;
        }
        self.points.get(row * self.geometry.width() + col)
    }

    /// Elevation channel. Empty cells keep negative infinity as no-data.
    pub fn elevations(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.z as f32).collect()
    }

    /// Label channel. Empty cells hold label 0.
    pub fn labels(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.label).collect()
    }

    /// Lowest and highest elevation among filled cells.
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .filter(|p| !p.is_sentinel())
            .fold(None, |range, p| match range {
                None => Some((p.z, p.z)),
                Some((lo, hi)) => Some((lo.min(p.z), hi.max(p.z))),
            })
    }
}

/// Runs worker pipelines over a point source and merges their grids.
pub struct Rasterizer {
    config: RasterConfig,
    show_progress: bool,
}

impl Rasterizer {
    /// Fails before anything is started when the configuration is invalid.
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

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Lay the grid over the source's bounding box and rasterise it.
    pub fn run<S>(&self, source: &S) -> Result<Raster>
    where
        S: PointSource + ?Sized,
    {
        let geometry = GridGeometry::new(&source.bounding_box(), self.config.cell_size)?;
        self.run_with_geometry(source, geometry)
    }

    /// Rasterise onto a caller supplied grid. Points outside it are dropped.
    pub fn run_with_geometry<S>(&self, source: &S, geometry: GridGeometry) -> Result<Raster>
    where
        S: PointSource + ?Sized,
    {
        let total_points = source.total_point_count();
        let partitions = partition_ranges(total_points, self.config.workers);

        info!(
            "Rasterising {} points into {}x{} cells with {} worker(s)",
            total_points,
            geometry.width(),
            geometry.height(),
            partitions.len()
        );

        let workers: Vec<Worker> = (0..partitions.len())
            .map(|id| Worker::new(id, geometry))
            .collect();

        let progress = self.progress_bar(total_points)?;
        let tallies = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers.len());
            let mut spawned = Ok(());
            for (worker, partition) in workers.iter().zip(&partitions) {
                match worker.spawn(scope, source, *partition, &progress) {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawned = Err(e);
                        break;
                    }
                }
            }

            // Every started worker is joined before the first failure is
            // returned; an unjoined panicked thread would re-panic the scope.
            let joined: Vec<Result<WorkerTally>> =
                handles.into_iter().map(WorkerHandles::join).collect();
            spawned?;
            joined.into_iter().collect::<Result<Vec<WorkerTally>>>()
        })?;
        progress.finish_with_message("Points binned");

        info!("Merging {} worker grids", workers.len());
        let points = merge(workers.into_iter().map(Worker::into_points));

        let stats = RunStats {
            total_points,
            committed_points: tallies.iter().map(|t| t.committed).sum(),
            discarded_points: tallies.iter().map(|t| t.discarded).sum(),
            filled_cells: points.iter().filter(|p| !p.is_sentinel()).count(),
            workers: tallies.len(),
        };
        debug!("Run statistics: {:?}", stats);

        Ok(Raster {
            points,
            geometry,
            stats,
        })
    }

    fn progress_bar(&self, total_points: usize) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(total_points as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} points ({percent}%) {msg}")?
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb.set_message("Binning points");
        Ok(pb)
    }
}

/// Rasterise `source` with `config` in one call.
pub fn rasterize<S>(source: &S, config: RasterConfig) -> Result<Raster>
where
    S: PointSource + ?Sized,
{
    Rasterizer::new(config)?.run(source)
}

/// Fold every grid into the first one, cell by cell. A cell is replaced
/// only by a strictly higher point, so among equal maxima the one from the
/// earliest partition is kept.
fn merge<I>(grids: I) -> Vec<Point>
where
    I: IntoIterator<Item = Vec<Point>>,
{
    let mut grids = grids.into_iter();
    let Some(mut merged) = grids.next() else {
        return Vec::new();
    };
    for grid in grids {
        for (slot, other) in merged.iter_mut().zip(grid) {
            if other.outranks(slot) {
                *slot = other;
            }
        }
    }
    merged
}

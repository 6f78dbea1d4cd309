//! Point cloud to DSM converter main entry point
use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use point_cloud_dsm::DsmConverter;
use point_cloud_dsm::constants::DEFAULT_CELL_SIZE;
use point_cloud_dsm::discovery::{OutputMode, find_point_clouds, resolve_output_stem, summarize};
use point_cloud_dsm::rasterizer::{RasterConfig, default_worker_count};
use std::path::PathBuf;
use std::time::Instant;

/// Rasterise LAS/LAZ point clouds into DSM and label GeoTIFF-style rasters.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory (or single file) to search for .las/.laz files.
    #[arg(long, default_value = "./")]
    dir: PathBuf,

    /// Pixel size in world units.
    #[arg(long, default_value_t = DEFAULT_CELL_SIZE)]
    size: f64,

    /// Output directory and/or file name. Defaults to next to each input.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Logical CPUs to plan for. Defaults to all available.
    #[arg(long = "cpu-count")]
    cpu_count: Option<usize>,

    /// Worker pipelines. Defaults to half the CPU count.
    #[arg(long)]
    workers: Option<usize>,

    /// Rasterise all discovered files onto a single grid.
    #[arg(long)]
    merge: bool,

    /// Hide progress bars.
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let start = Instant::now();

    let cpu_count = args.cpu_count.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let workers = args.workers.unwrap_or_else(|| default_worker_count(cpu_count));
    info!("Running on {} CPU(s) with {} worker(s)", cpu_count, workers);

    let converter =
        DsmConverter::new(RasterConfig::new(args.size, workers))?.with_progress(!args.quiet);

    let out = args.out.unwrap_or_default();
    let files = find_point_clouds(&args.dir)
        .with_context(|| format!("cannot search {}", args.dir.display()))?;
    let summary = summarize(&files);
    info!(
        "{} file(s), {} points, extent X {:.2}..{:.2} Y {:.2}..{:.2}",
        summary.files.len(),
        summary.total_points,
        summary.bounds.min_x,
        summary.bounds.max_x,
        summary.bounds.min_y,
        summary.bounds.max_y
    );

    if !summary.unreadable.is_empty() {
        warn!("{} file(s) have unreadable headers", summary.unreadable.len());
    }

    if args.merge {
        // Files without a readable header cannot be placed on the shared grid.
        let readable: Vec<PathBuf> = summary.files.iter().map(|h| h.path.clone()).collect();
        if let Some(first) = readable.first() {
            let stem = resolve_output_stem(&out, first, OutputMode::Directory);
            converter
                .convert_merged(&readable, &stem)
                .with_context(|| format!("failed to merge into {}", stem.display()))?;
        }
    } else {
        let failed = converter
            .convert_each(&files, &out)
            .iter()
            .filter(|result| result.is_err())
            .count();
        if failed > 0 {
            bail!("{failed} of {} file(s) failed to convert", files.len());
        }
    }

    info!("Finished job, used {:.2?}", start.elapsed());
    Ok(())
}

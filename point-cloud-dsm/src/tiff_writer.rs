//! TIFF encoding of the merged raster plus world file sidecars.
use crate::constants::{DSM_SUFFIX, LABEL_SUFFIX, WORLD_FILE_PRECISION};
use crate::error::Result;
use crate::geometry::GridGeometry;
use crate::rasterizer::Raster;
use log::info;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiff::encoder::{TiffEncoder, colortype};

/// Files produced for one raster channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenChannel {
    pub image: PathBuf,
    pub world_file: PathBuf,
}

/// `<stem><suffix>` without touching any extension already in the stem.
pub fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the elevation channel as 32-bit float samples to `<stem>_dsm.tiff`.
/// Empty cells keep negative infinity.
pub fn write_dsm(stem: &Path, raster: &Raster) -> Result<WrittenChannel> {
    let geometry = raster.geometry();
    let data = top_down(&raster.elevations(), geometry.width(), geometry.height());
    let channel = channel_paths(stem, DSM_SUFFIX);

    info!("Saving DSM at {}", channel.image.display());
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(&channel.image)?))?;
    encoder.write_image::<colortype::Gray32Float>(
        geometry.width() as u32,
        geometry.height() as u32,
        &data,
    )?;
    write_world_file(&channel.world_file, geometry)?;
    Ok(channel)
}

/// Write the label channel as 32-bit unsigned samples to `<stem>_label.tiff`.
pub fn write_labels(stem: &Path, raster: &Raster) -> Result<WrittenChannel> {
    let geometry = raster.geometry();
    let data = top_down(&raster.labels(), geometry.width(), geometry.height());
    let channel = channel_paths(stem, LABEL_SUFFIX);

    info!("Saving labels at {}", channel.image.display());
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(&channel.image)?))?;
    encoder.write_image::<colortype::Gray32>(
        geometry.width() as u32,
        geometry.height() as u32,
        &data,
    )?;
    write_world_file(&channel.world_file, geometry)?;
    Ok(channel)
}

/// Six line world file: pixel size, rotation terms, negative pixel size,
/// then the upper-left pixel centre with fixed precision.
pub fn world_file_contents(geometry: &GridGeometry) -> String {
    let [gap, rot_y, rot_x, neg_gap, ul_x, ul_y] = geometry.world_transform();
    format!(
        "{gap}\n{rot_y}\n{rot_x}\n{neg_gap}\n{ul_x:.prec$}\n{ul_y:.prec$}",
        prec = WORLD_FILE_PRECISION
    )
}

fn write_world_file(path: &Path, geometry: &GridGeometry) -> Result<()> {
    std::fs::write(path, world_file_contents(geometry))?;
    Ok(())
}

fn channel_paths(stem: &Path, suffix: &str) -> WrittenChannel {
    let base = with_suffix(stem, suffix);
    WrittenChannel {
        image: with_suffix(&base, ".tiff"),
        world_file: with_suffix(&base, ".tfw"),
    }
}

/// Grid rows run bottom-up from the origin; image rows run top-down.
fn top_down<T: Copy>(values: &[T], width: usize, height: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for row in (0..height).rev() {
        out.extend_from_slice(&values[row * width..(row + 1) * width]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::PointBounds;
    use crate::point::Point;
    use crate::rasterizer::{RasterConfig, rasterize};
    use crate::source::VecPointSource;
    use tempfile::TempDir;
    use tiff::decoder::{Decoder, DecodingResult};

    fn sample_raster() -> Raster {
        // 2 columns x 3 rows, one point in the bottom-left and top-right cells.
        let source = VecPointSource::with_bounds(
            vec![
                Point::new(10.5, 20.5, 1.5, 11),
                Point::new(11.5, 22.5, 8.0, 22),
            ],
            PointBounds::from_xy(10.0, 20.0, 12.0, 23.0),
        );
        rasterize(&source, RasterConfig::new(1.0, 1)).unwrap()
    }

    #[test]
    fn test_top_down_flips_rows() {
        let values = [0, 1, 2, 3, 4, 5];
        assert_eq!(top_down(&values, 2, 3), vec![4, 5, 2, 3, 0, 1]);
    }

    #[test]
    fn test_with_suffix_keeps_dots_in_stem() {
        let path = with_suffix(Path::new("out/tile.v2"), "_dsm");
        assert_eq!(path, PathBuf::from("out/tile.v2_dsm"));
    }

    #[test]
    fn test_world_file_contents() {
        let geometry = GridGeometry::new(&PointBounds::from_xy(10.0, 20.0, 12.0, 23.0), 0.5).unwrap();
        assert_eq!(
            world_file_contents(&geometry),
            "0.5\n0\n0\n-0.5\n10.25000\n22.75000"
        );
    }

    #[test]
    fn test_dsm_round_trip() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("tile");
        let raster = sample_raster();

        let written = write_dsm(&stem, &raster).unwrap();
        assert_eq!(written.image, dir.path().join("tile_dsm.tiff"));
        assert!(written.world_file.exists());

        let mut decoder = Decoder::new(File::open(&written.image).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (2, 3));
        let DecodingResult::F32(samples) = decoder.read_image().unwrap() else {
            panic!("expected float samples");
        };
        // First image row is the top grid row.
        assert_eq!(samples[1], 8.0);
        assert_eq!(samples[4], 1.5);
        assert_eq!(samples[0], f32::NEG_INFINITY);
    }

    #[test]
    fn test_label_round_trip() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("tile");
        let written = write_labels(&stem, &sample_raster()).unwrap();

        let mut decoder = Decoder::new(File::open(&written.image).unwrap()).unwrap();
        let DecodingResult::U32(samples) = decoder.read_image().unwrap() else {
            panic!("expected u32 samples");
        };
        assert_eq!(samples, vec![0, 22, 0, 0, 11, 0]);

        let world = std::fs::read_to_string(&written.world_file).unwrap();
        assert_eq!(world, "1\n0\n0\n-1\n10.50000\n22.50000");
    }
}

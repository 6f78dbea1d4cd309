/// Shared configuration for point cloud rasterisation

/// Default raster cell size in world units
pub const DEFAULT_CELL_SIZE: f64 = 0.01;

/// Concurrent pipeline stages each worker runs next to its producer
pub const STAGES_PER_WORKER: usize = 2;

/// Points handled between progress bar updates
pub const PROGRESS_UPDATE_INTERVAL: usize = 50_000;

/// File name fragments identifying point cloud inputs
pub const POINT_CLOUD_PATTERNS: &[&str] = &[".las", ".laz"];

/// Base name for outputs that are not derived from a single input
pub const OUTPUT_PREFIX: &str = "PointDensity";

/// Suffixes appended to the output stem
pub const DSM_SUFFIX: &str = "_dsm";
pub const LABEL_SUFFIX: &str = "_label";
pub const METADATA_SUFFIX: &str = "_metadata.json";

/// Decimal places written for world file origin coordinates
pub const WORLD_FILE_PRECISION: usize = 5;

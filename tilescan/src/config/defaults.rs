//! Default values for configuration settings.

pub use crate::detection::DEFAULT_CONFIDENCE;
pub use crate::storage::{DEFAULT_REGION, DEFAULT_TIMEOUT_SECS};

/// Parallel downloads; 0 lets rayon pick one per CPU.
pub const DEFAULT_CONCURRENCY: usize = 0;

/// Tile and detector input edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

pub const DEFAULT_ROOT_TEMPLATE: &str = "public/{project}/manifold/orthomosaic_tiles";

/// Storage keys carry no extension unless configured.
pub const DEFAULT_TILE_EXTENSION: &str = "";

pub const DEFAULT_DETECTOR_PROGRAM: &str = "python";

pub const DEFAULT_DETECTOR_SCRIPT: &str = "yolov9/detect.py";

pub const DEFAULT_WEIGHTS: &str = "weights/pothole.pt";

pub const DEFAULT_WORK_DIR: &str = "tiles";

pub const DEFAULT_LOG_DIR: &str = "logs";

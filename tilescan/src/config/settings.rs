//! Settings structs for each configuration section.
//!
//! Each struct is one `[section]` of config.ini. Parsing lives in
//! [`super::parser`] and serialization in [`super::writer`].

use std::path::PathBuf;

use super::defaults::*;
use crate::storage::{bucket_endpoint, Credentials};

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub imagery: ImagerySettings,
    pub detection: DetectionSettings,
    pub paths: PathSettings,
}

/// Object storage access.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Explicit base URL; overrides the bucket URL when set
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    /// Key pair for signed requests; anonymous access when unset
    pub credentials: Option<Credentials>,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Parallel downloads, 0 for one per CPU
    pub concurrency: usize,
}

/// Orthomosaic tile layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagerySettings {
    /// Tile edge in pixels
    pub tile_size: u32,
    /// Storage prefix of the tile pyramid; `{project}` is substituted
    pub root_template: String,
    /// Extension appended to tile keys, empty for none
    pub extension: String,
}

/// External detector invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub program: String,
    pub script: PathBuf,
    pub weights: PathBuf,
    /// Detector input size in pixels; must match `imagery.tile_size`
    pub image_size: u32,
    pub confidence: f64,
}

/// Local working paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    /// Tiles are downloaded into `{work_dir}/{project}`
    pub work_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Keep downloaded tiles after a survey
    pub keep_tiles: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: None,
            region: DEFAULT_REGION.to_string(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Default for ImagerySettings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            root_template: DEFAULT_ROOT_TEMPLATE.to_string(),
            extension: DEFAULT_TILE_EXTENSION.to_string(),
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_DETECTOR_PROGRAM.to_string(),
            script: PathBuf::from(DEFAULT_DETECTOR_SCRIPT),
            weights: PathBuf::from(DEFAULT_WEIGHTS),
            image_size: DEFAULT_TILE_SIZE,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            keep_tiles: false,
        }
    }
}

impl StorageSettings {
    /// Base URL requests go to, if one can be derived.
    pub fn resolved_endpoint(&self) -> Option<String> {
        match (&self.endpoint, &self.bucket) {
            (Some(endpoint), _) => Some(endpoint.clone()),
            (None, Some(bucket)) => Some(bucket_endpoint(bucket, &self.region)),
            (None, None) => None,
        }
    }
}

//! Defect detection on downloaded tiles.
//!
//! Detection itself runs outside this crate. A [`Detector`] takes a
//! directory of `{lng}_{lat}.png` tiles and returns the boxes found in
//! each, read back from YOLO label files.

mod label;
mod yolo;

pub use label::{
    parse_label_file, point_from_file_stem, read_label_directory, LABEL_EXTENSION,
};
pub use yolo::{YoloCommandDetector, PREDICT_DIR_NAME};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::coord::GeoPoint;

/// Confidence threshold used when none is configured.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Errors from running a detector or reading its output.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// A label line that does not hold six numeric fields.
    #[error("{}:{line}: malformed label ({reason})", .file.display())]
    MalformedLabel {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// A label file whose name is not `{lng}_{lat}`.
    #[error("label file name {} does not encode a tile point", .0.display())]
    InvalidFileName(PathBuf),

    /// The detector program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    /// The detector program exited unsuccessfully.
    #[error("{program} exited with {status}")]
    ProcessFailed { program: String, status: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// One detected box, in fractions of the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    /// Box center
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
}

/// Detections for one tile image.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDetections {
    /// Tile center recovered from the file name
    pub point: GeoPoint,
    pub detections: Vec<Detection>,
}

/// Finds defects in a directory of tile images.
pub trait Detector: Send + Sync {
    /// Runs detection over the images in `tile_dir`.
    fn detect(&self, tile_dir: &Path) -> Result<Vec<TileDetections>, DetectionError>;

    /// Pixel size of the images the detector's box fractions refer to.
    fn input_size_px(&self) -> u32;
}

/// Reads labels that already exist instead of running a model.
///
/// With no explicit directory, labels are read from
/// `{tile_dir}/predict/labels`, where [`YoloCommandDetector`] leaves them.
#[derive(Debug, Clone)]
pub struct LabelDirectoryDetector {
    labels_dir: Option<PathBuf>,
    input_size_px: u32,
    min_confidence: f64,
}

impl LabelDirectoryDetector {
    pub fn new(input_size_px: u32, min_confidence: f64) -> Self {
        Self {
            labels_dir: None,
            input_size_px,
            min_confidence,
        }
    }

    /// Reads from `labels_dir` regardless of the tile directory.
    pub fn with_labels_dir(mut self, labels_dir: impl Into<PathBuf>) -> Self {
        self.labels_dir = Some(labels_dir.into());
        self
    }

    pub fn labels_dir_for(&self, tile_dir: &Path) -> PathBuf {
        match &self.labels_dir {
            Some(dir) => dir.clone(),
            None => tile_dir.join(PREDICT_DIR_NAME).join("labels"),
        }
    }
}

impl Detector for LabelDirectoryDetector {
    fn detect(&self, tile_dir: &Path) -> Result<Vec<TileDetections>, DetectionError> {
        read_label_directory(&self.labels_dir_for(tile_dir), self.min_confidence)
    }

    fn input_size_px(&self) -> u32 {
        self.input_size_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_label_directory_defaults_to_predict_output() {
        let dir = TempDir::new().unwrap();
        let labels = dir.path().join("predict").join("labels");
        fs::create_dir_all(&labels).unwrap();
        fs::write(labels.join("127.0_37.5.txt"), "0 0.5 0.5 0.1 0.1 0.3\n0 0.5 0.5 0.2 0.2 0.8\n")
            .unwrap();

        let detector = LabelDirectoryDetector::new(256, DEFAULT_CONFIDENCE);
        let tiles = detector.detect(dir.path()).unwrap();

        assert_eq!(detector.input_size_px(), 256);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].point, GeoPoint::new(127.0, 37.5));
        assert_eq!(tiles[0].detections.len(), 1);
        assert_eq!(tiles[0].detections[0].width, 0.2);
    }

    #[test]
    fn test_explicit_labels_dir() {
        let labels = TempDir::new().unwrap();
        fs::write(labels.path().join("1.5_2.5.txt"), "0 0.5 0.5 0.1 0.1 0.9\n").unwrap();

        let detector =
            LabelDirectoryDetector::new(256, 0.5).with_labels_dir(labels.path());
        let tiles = detector.detect(Path::new("/does/not/matter")).unwrap();
        assert_eq!(tiles[0].point, GeoPoint::new(1.5, 2.5));
    }

    #[test]
    fn test_error_messages() {
        let err = DetectionError::MalformedLabel {
            file: PathBuf::from("labels/1.0_2.0.txt"),
            line: 3,
            reason: "expected 6 fields, found 4".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "labels/1.0_2.0.txt:3: malformed label (expected 6 fields, found 4)"
        );
    }
}

//! YOLO label files.
//!
//! One file per image, named after the image. Each line holds one box:
//!
//! ```text
//! classId xCenter yCenter width height confidence
//! 0 0.512 0.430 0.050 0.047 0.81
//! ```
//!
//! Coordinates are fractions of the image size.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::{Detection, DetectionError, TileDetections};
use crate::coord::GeoPoint;

/// Extension of label files.
pub const LABEL_EXTENSION: &str = "txt";

/// Parses the `{lng}_{lat}` stem of a tile image or label file.
pub fn point_from_file_stem(stem: &str) -> Option<GeoPoint> {
    let (lng, lat) = stem.split_once('_')?;
    let lng: f64 = lng.parse().ok()?;
    let lat: f64 = lat.parse().ok()?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(GeoPoint::new(lng, lat))
}

fn parse_line(line: &str) -> Result<Detection, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    }

    let class_id: u32 = fields[0]
        .parse()
        .map_err(|_| format!("class id '{}' is not an integer", fields[0]))?;

    let mut values = [0.0f64; 5];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
        *value = field
            .parse()
            .map_err(|_| format!("'{}' is not a number", field))?;
    }
    let [x, y, width, height, confidence] = values;

    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("confidence {} is outside [0, 1]", confidence));
    }

    Ok(Detection {
        class_id,
        x,
        y,
        width,
        height,
        confidence,
    })
}

/// Reads one label file, keeping boxes at or above `min_confidence`.
pub fn parse_label_file(path: &Path, min_confidence: f64) -> Result<Vec<Detection>, DetectionError> {
    let content = fs::read_to_string(path).map_err(|source| DetectionError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut detections = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let detection = parse_line(line).map_err(|reason| DetectionError::MalformedLabel {
            file: path.to_path_buf(),
            line: index + 1,
            reason,
        })?;
        if detection.confidence >= min_confidence {
            detections.push(detection);
        }
    }
    Ok(detections)
}

/// Reads every label file in `labels_dir`.
///
/// A missing directory means nothing was detected. Results are ordered by
/// tile point.
pub fn read_label_directory(
    labels_dir: &Path,
    min_confidence: f64,
) -> Result<Vec<TileDetections>, DetectionError> {
    if !labels_dir.is_dir() {
        debug!(dir = %labels_dir.display(), "No labels directory, nothing detected");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(labels_dir).map_err(|source| DetectionError::Io {
        path: labels_dir.to_path_buf(),
        source,
    })?;

    let mut tiles = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| DetectionError::Io {
                path: labels_dir.to_path_buf(),
                source,
            })?
            .path();

        let is_label = path.is_file()
            && path
                .extension()
                .map(|ext| ext == LABEL_EXTENSION)
                .unwrap_or(false);
        if !is_label {
            continue;
        }

        let point = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(point_from_file_stem)
            .ok_or_else(|| DetectionError::InvalidFileName(path.clone()))?;

        let detections = parse_label_file(&path, min_confidence)?;
        tiles.push(TileDetections { point, detections });
    }

    tiles.sort_by(|a, b| {
        a.point
            .lng
            .total_cmp(&b.point.lng)
            .then(a.point.lat.total_cmp(&b.point.lat))
    });

    let boxes: usize = tiles.iter().map(|t| t.detections.len()).sum();
    if boxes == 0 && !tiles.is_empty() {
        warn!(
            files = tiles.len(),
            min_confidence, "Label files present but every box is below the threshold"
        );
    }
    debug!(files = tiles.len(), boxes, "Read label directory");
    Ok(tiles)
}

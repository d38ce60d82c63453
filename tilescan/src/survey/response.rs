//! Grading detections into result entries.

use tracing::warn;

use crate::detection::TileDetections;
use crate::request::ResponseEntry;
use crate::resolution::PixelScale;
use crate::severity::{severity_distribution, severity_grade, SeverityGrade};

/// Grades every detection of one tile.
///
/// Boxes whose size fractions fall outside `[0, 1]` are skipped with a
/// warning.
pub fn grade_tile(tile: &TileDetections, scale: &PixelScale) -> Vec<SeverityGrade> {
    tile.detections
        .iter()
        .filter_map(|d| match scale.diagonal_length_cm(d.width, d.height) {
            Ok(length) => Some(severity_grade(length)),
            Err(e) => {
                warn!(
                    point = %tile.point,
                    width = d.width,
                    height = d.height,
                    error = %e,
                    "Skipping detection with invalid size"
                );
                None
            }
        })
        .collect()
}

/// Builds the result entries for a set of detected tiles.
///
/// Tiles without gradable detections produce no entry. Entries are ordered
/// by point, longitude first.
pub fn build_response(tiles: &[TileDetections], scale: &PixelScale) -> Vec<ResponseEntry> {
    let mut entries = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let grades = grade_tile(tile, scale);
        let Some(&worst) = grades.iter().max() else {
            continue;
        };
        entries.push(ResponseEntry {
            point: tile.point,
            grade: worst,
            percentage: severity_distribution(&grades),
        });
    }

    entries.sort_by(|a, b| {
        a.point
            .lng
            .total_cmp(&b.point.lng)
            .then(a.point.lat.total_cmp(&b.point.lat))
    });
    entries
}

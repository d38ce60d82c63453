//! Polygon-to-tile coverage
//!
//! Finds every tile at a zoom level whose footprint overlaps an area polygon
//! given in projected coordinates.
//!
//! # Algorithm
//!
//! 1. Take the polygon's bounding box in projected coordinates.
//! 2. Convert the four box corners to geographic and then to tiles. The
//!    spanned x/y range, widened by one tile on each side, is the candidate
//!    set. Projected edges curve in geographic space, and the margin absorbs
//!    that. Cost scales with the candidate area, not polygon complexity.
//! 3. Keep each candidate whose footprint (the tile's four corners
//!    projected into the polygon's system) overlaps the polygon interior
//!    or boundary. The test is a full ring/ring intersection, so thin
//!    slivers crossing a tile are covered even when no vertex or tile
//!    center lies inside.
//! 4. Multiple polygons are unioned.
//!
//! Results are a [`BTreeSet`], so iteration order is deterministic and
//! independent of vertex order.

mod encoder;
mod polygon;

pub use encoder::{CoveragePlan, SkippedArea, TileJob, TmsPathEncoder};
pub use polygon::{BoundingBox, Polygon, PolygonDefect};

use std::collections::BTreeSet;

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::coord::{CoordError, TileCoord, TileIndexConverter};
use crate::crs::{CoordinateConverter, ProjectionError};

/// Errors from coverage computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverageError {
    /// The area ring is not a valid simple polygon.
    #[error("invalid polygon: {0}")]
    InvalidPolygon(PolygonDefect),

    /// Projection lookup or tagging failed.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// A polygon corner falls outside the tile pyramid.
    #[error(transparent)]
    Coord(#[from] CoordError),

    /// Every area in a multi-area request was rejected.
    #[error("none of the {skipped} areas could be covered")]
    NoValidArea { skipped: usize },
}

impl From<PolygonDefect> for CoverageError {
    fn from(defect: PolygonDefect) -> Self {
        CoverageError::InvalidPolygon(defect)
    }
}

/// Inclusive candidate tile range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CandidateRange {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl CandidateRange {
    fn tile_count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }
}

fn candidate_range(
    polygon: &Polygon,
    tiles: &TileIndexConverter,
    crs: &CoordinateConverter,
) -> Result<CandidateRange, CoverageError> {
    let corners = polygon.bounding_box().corners();
    let corner_tile = |(x, y): (f64, f64)| {
        let geo = crs.to_geographic(x, y);
        tiles.geo_to_tile(geo.lng, geo.lat)
    };

    let first = corner_tile(corners[0])?;
    let mut r = CandidateRange {
        min_x: first.x,
        max_x: first.x,
        min_y: first.y,
        max_y: first.y,
    };
    for &corner in &corners[1..] {
        let tile = corner_tile(corner)?;
        r.min_x = r.min_x.min(tile.x);
        r.max_x = r.max_x.max(tile.x);
        r.min_y = r.min_y.min(tile.y);
        r.max_y = r.max_y.max(tile.y);
    }

    let last = tiles.tiles_per_side() - 1;

    Ok(CandidateRange {
        min_x: r.min_x.saturating_sub(1),
        max_x: (r.max_x + 1).min(last),
        min_y: r.min_y.saturating_sub(1),
        max_y: (r.max_y + 1).min(last),
    })
}

fn tile_overlaps(
    polygon: &Polygon,
    tiles: &TileIndexConverter,
    crs: &CoordinateConverter,
    x: u32,
    y: u32,
) -> Result<bool, CoverageError> {
    let footprint = tiles
        .tile_bounds(x, y)?
        .corners()
        .map(|corner| {
            let p = crs.project(corner);
            (p.x(), p.y())
        });
    Ok(polygon.intersects_ring(&footprint))
}

fn check_epsg(polygon: &Polygon, crs: &CoordinateConverter) -> Result<(), CoverageError> {
    if polygon.epsg() != crs.epsg() {
        return Err(ProjectionError::EpsgMismatch {
            expected: crs.epsg(),
            actual: polygon.epsg(),
        }
        .into());
    }
    Ok(())
}

/// Tiles at `zoom` overlapping `polygon`.
///
/// The projection is looked up from the polygon's EPSG code.
pub fn coverage(polygon: &Polygon, zoom: u8) -> Result<BTreeSet<TileCoord>, CoverageError> {
    let tiles = TileIndexConverter::new(zoom)?;
    let crs = CoordinateConverter::new(polygon.epsg())?;
    coverage_with(polygon, &tiles, &crs)
}

/// Tiles overlapping `polygon`, with caller-supplied converters.
pub fn coverage_with(
    polygon: &Polygon,
    tiles: &TileIndexConverter,
    crs: &CoordinateConverter,
) -> Result<BTreeSet<TileCoord>, CoverageError> {
    check_epsg(polygon, crs)?;
    let range = candidate_range(polygon, tiles, crs)?;
    debug!(
        zoom = tiles.zoom(),
        candidates = range.tile_count(),
        vertices = polygon.len(),
        "Evaluating coverage candidates"
    );

    let mut covered = BTreeSet::new();
    for x in range.min_x..=range.max_x {
        for y in range.min_y..=range.max_y {
            if tile_overlaps(polygon, tiles, crs, x, y)? {
                covered.insert(TileCoord {
                    zoom: tiles.zoom(),
                    x,
                    y,
                });
            }
        }
    }
    Ok(covered)
}

/// Same result as [`coverage_with`], with columns evaluated on the rayon pool.
pub fn coverage_parallel(
    polygon: &Polygon,
    tiles: &TileIndexConverter,
    crs: &CoordinateConverter,
) -> Result<BTreeSet<TileCoord>, CoverageError> {
    check_epsg(polygon, crs)?;
    let range = candidate_range(polygon, tiles, crs)?;
    let zoom = tiles.zoom();

    let columns: Vec<Vec<TileCoord>> = (range.min_x..=range.max_x)
        .into_par_iter()
        .map(|x| {
            let mut column = Vec::new();
            for y in range.min_y..=range.max_y {
                if tile_overlaps(polygon, tiles, crs, x, y)? {
                    column.push(TileCoord { zoom, x, y });
                }
            }
            Ok(column)
        })
        .collect::<Result<_, CoverageError>>()?;

    Ok(columns.into_iter().flatten().collect())
}

/// Union of the coverage of several polygons.
pub fn coverage_union(
    polygons: &[Polygon],
    zoom: u8,
) -> Result<BTreeSet<TileCoord>, CoverageError> {
    let mut covered = BTreeSet::new();
    for polygon in polygons {
        covered.extend(coverage(polygon, zoom)?);
    }
    Ok(covered)
}

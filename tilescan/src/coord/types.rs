//! Coordinate value types and errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum latitude representable in Web Mercator, `atan(sinh(π))` in degrees.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -MAX_LAT;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level (keeps `2^zoom` inside a `u32`).
pub const MAX_ZOOM: u8 = 30;

/// Errors from tile index conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude at or beyond the Web Mercator cutoff (±85.0511°).
    #[error("latitude {0} is outside the Web Mercator domain (|lat| < 85.0511)")]
    OutOfDomainLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    /// Zoom level outside the supported range.
    #[error("zoom level {0} is outside 0..=30")]
    InvalidZoom(u8),

    /// Tile column or row does not exist at the zoom level.
    #[error("tile {x}/{y} does not exist at zoom {zoom}")]
    TileOutOfRange { zoom: u8, x: u32, y: u32 },
}

/// A geographic position on WGS84, in degrees.
///
/// Serialized as a `[lng, lat]` pair, which is the order used by the
/// request and response documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lng, point.lat]
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lng, self.lat)
    }
}

/// A tile in the TMS pyramid.
///
/// `y` follows the TMS convention: row 0 is the southernmost row. Field order
/// gives the derived `Ord` a stable (zoom, x, y) ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    /// Zoom level
    pub zoom: u8,
    /// Column, 0 at 180°W, increasing eastward
    pub x: u32,
    /// TMS row, 0 at ~85.05°S, increasing northward
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate, checking it exists at `zoom`.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = 1u32 << zoom;
        if x >= n || y >= n {
            return Err(CoordError::TileOutOfRange { zoom, x, y });
        }
        Ok(Self { zoom, x, y })
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Geographic extent of a single tile, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl TileBounds {
    /// Corners as a counter-clockwise ring starting at the south-west corner.
    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            GeoPoint::new(self.west, self.south),
            GeoPoint::new(self.east, self.south),
            GeoPoint::new(self.east, self.north),
            GeoPoint::new(self.west, self.north),
        ]
    }

    /// True if the point lies inside or on the edge of the tile.
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.west..=self.east).contains(&point.lng) && (self.south..=self.north).contains(&point.lat)
    }
}

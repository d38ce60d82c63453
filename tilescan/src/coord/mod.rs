//! Tile index conversion
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and TMS tile coordinates in the Web Mercator slippy-map pyramid.
//!
//! Tiles use the TMS row convention: row 0 is at the southern edge of the
//! pyramid. The XYZ convention used by most web maps numbers rows from the
//! north instead; [`tms_flip`] converts between the two.
//!
//! # Latitude domain
//!
//! The Mercator row formula diverges at the poles. Callers must keep
//! `|lat| < 85.0511287798°`; [`TileIndexConverter::geo_to_tile`] checks this
//! and returns [`CoordError::OutOfDomainLatitude`] otherwise.

mod types;

pub use types::{
    CoordError, GeoPoint, TileBounds, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts between the XYZ and TMS row numbering at `zoom`.
///
/// The mapping is `y' = 2^zoom - y - 1` and is its own inverse.
/// `y` must be a valid row at `zoom`.
#[inline]
pub fn tms_flip(y: u32, zoom: u8) -> u32 {
    debug_assert!(zoom <= MAX_ZOOM && y < (1u32 << zoom));
    (1u32 << zoom) - y - 1
}

/// Latitude in degrees of the northern edge of XYZ row `row` (may be fractional).
#[inline]
fn row_edge_latitude(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}

/// Unchecked XYZ Mercator row for `lat`, not yet floored.
///
/// Diverges as `|lat|` approaches 90°.
#[inline]
fn mercator_row(lat: f64, n: f64) -> f64 {
    let lat_rad = lat.to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n
}

/// Tile index converter scoped to a single zoom level.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileIndexConverter {
    zoom: u8,
}

impl TileIndexConverter {
    /// Creates a converter for `zoom` (0 to 30).
    pub fn new(zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        Ok(Self { zoom })
    }

    /// Zoom level this converter is valid for.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Number of tiles along each axis, `2^zoom`.
    pub fn tiles_per_side(&self) -> u32 {
        1u32 << self.zoom
    }

    fn n(&self) -> f64 {
        self.tiles_per_side() as f64
    }

    fn check_tile(&self, x: u32, y: u32) -> Result<(), CoordError> {
        let n = self.tiles_per_side();
        if x >= n || y >= n {
            return Err(CoordError::TileOutOfRange {
                zoom: self.zoom,
                x,
                y,
            });
        }
        Ok(())
    }

    /// Geographic extent of TMS tile (`x`, `y`).
    pub fn tile_bounds(&self, x: u32, y: u32) -> Result<TileBounds, CoordError> {
        self.check_tile(x, y)?;
        let n = self.n();
        let row = tms_flip(y, self.zoom) as f64;

        Ok(TileBounds {
            west: x as f64 / n * 360.0 - 180.0,
            east: (x + 1) as f64 / n * 360.0 - 180.0,
            north: row_edge_latitude(row, n),
            south: row_edge_latitude(row + 1.0, n),
        })
    }

    /// Geographic center of TMS tile (`x`, `y`).
    ///
    /// The longitude is the exact midpoint of the column. The latitude is the
    /// arithmetic mean of the tile's north and south edge latitudes, not the
    /// latitude at the tile's Mercator midpoint. Downstream file names depend
    /// on this exact value.
    pub fn tile_center_to_geo(&self, x: u32, y: u32) -> Result<GeoPoint, CoordError> {
        let bounds = self.tile_bounds(x, y)?;
        let n = self.n();

        let lng = x as f64 / n * 360.0 - 180.0 + 180.0 / n;
        let lat = (bounds.north + bounds.south) / 2.0;

        Ok(GeoPoint::new(lng, lat))
    }

    /// Center of `tile`, which must belong to this converter's zoom.
    pub fn center_of(&self, tile: &TileCoord) -> Result<GeoPoint, CoordError> {
        if tile.zoom != self.zoom {
            return Err(CoordError::InvalidZoom(tile.zoom));
        }
        self.tile_center_to_geo(tile.x, tile.y)
    }

    /// TMS tile containing the geographic position.
    ///
    /// # Arguments
    ///
    /// * `lng` - Longitude in degrees (-180.0 to 180.0)
    /// * `lat` - Latitude in degrees, strictly inside ±85.05112878
    ///
    /// A longitude of exactly 180° maps to the last column.
    pub fn geo_to_tile(&self, lng: f64, lat: f64) -> Result<TileCoord, CoordError> {
        if !(lat.abs() < MAX_LAT) {
            return Err(CoordError::OutOfDomainLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lng) {
            return Err(CoordError::InvalidLongitude(lng));
        }

        let n = self.n();
        let max = self.tiles_per_side() - 1;

        let x = (((lng + 180.0) / 360.0 * n).floor() as u32).min(max);
        // `as u32` saturates at 0 for the tiny negative values seen right at the cutoff
        let row = (mercator_row(lat, n).floor() as u32).min(max);

        Ok(TileCoord {
            zoom: self.zoom,
            x,
            y: tms_flip(row, self.zoom),
        })
    }

    /// TMS tile containing `point`.
    pub fn tile_for(&self, point: GeoPoint) -> Result<TileCoord, CoordError> {
        self.geo_to_tile(point.lng, point.lat)
    }
}

//! Coordinate reference system conversion
//!
//! Maps WGS84 geographic coordinates (EPSG:4326) to and from a projected
//! coordinate system identified by an EPSG code.
//!
//! Each supported system is a [`Projector`]. [`projector_for_epsg`] is the
//! single registry of known codes; adding a coordinate system means adding a
//! projector and a match arm there, without touching tile or polygon logic.
//!
//! # Supported codes
//!
//! | EPSG | System |
//! |------|--------|
//! | 4326 | WGS84 geographic (identity) |
//! | 3857, 900913 | Web Mercator |
//! | 32601–32660, 32701–32760 | WGS84 UTM north / south |
//! | 5185–5188 | Korea 2000 west / central / east / east sea belts |
//! | 5179 | Korea 2000 Unified CS |

mod transverse_mercator;
mod web_mercator;

pub use transverse_mercator::{Ellipsoid, TransverseMercator};
pub use web_mercator::{Geographic, WebMercator, EARTH_RADIUS_M};

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::coord::GeoPoint;

/// EPSG code of the fixed geographic reference.
pub const WGS84_EPSG: u32 = 4326;

/// Errors from coordinate reference system conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// No projection definition is known for the EPSG code.
    #[error("unsupported projection EPSG:{0}")]
    UnsupportedProjection(u32),

    /// A projected point was handed to a converter for another system.
    #[error("point is in EPSG:{actual} but the converter expects EPSG:{expected}")]
    EpsgMismatch { expected: u32, actual: u32 },
}

/// Forward and inverse math for one projected coordinate system.
///
/// Implementations are pure and hold only their defining parameters.
pub trait Projector: Send + Sync + fmt::Debug {
    /// EPSG code of the projected system.
    fn epsg(&self) -> u32;

    /// WGS84 longitude/latitude (degrees) to projected (x, y).
    fn to_projected(&self, lng: f64, lat: f64) -> (f64, f64);

    /// Projected (x, y) to WGS84 longitude/latitude (degrees).
    fn to_geographic(&self, x: f64, y: f64) -> (f64, f64);
}

/// Looks up the projector for an EPSG code.
pub fn projector_for_epsg(epsg: u32) -> Result<Arc<dyn Projector>, ProjectionError> {
    let projector: Arc<dyn Projector> = match epsg {
        WGS84_EPSG => Arc::new(Geographic),
        3857 | 900913 => Arc::new(WebMercator::with_code(epsg)),
        32601..=32660 => Arc::new(TransverseMercator::utm(epsg - 32600, true)),
        32701..=32760 => Arc::new(TransverseMercator::utm(epsg - 32700, false)),
        5185 => Arc::new(TransverseMercator::korea_belt(epsg, 125.0)),
        5186 => Arc::new(TransverseMercator::korea_belt(epsg, 127.0)),
        5187 => Arc::new(TransverseMercator::korea_belt(epsg, 129.0)),
        5188 => Arc::new(TransverseMercator::korea_belt(epsg, 131.0)),
        5179 => Arc::new(TransverseMercator::korea_unified()),
        _ => return Err(ProjectionError::UnsupportedProjection(epsg)),
    };
    Ok(projector)
}

/// A position in a projected coordinate system, tagged with its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    x: f64,
    y: f64,
    epsg: u32,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, epsg: u32) -> Self {
        Self { x, y, epsg }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }
}

/// Bidirectional converter between WGS84 and one projected system.
///
/// Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct CoordinateConverter {
    projector: Arc<dyn Projector>,
}

impl CoordinateConverter {
    /// Creates a converter for `epsg`.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::UnsupportedProjection`] if the code is unknown.
    pub fn new(epsg: u32) -> Result<Self, ProjectionError> {
        Ok(Self {
            projector: projector_for_epsg(epsg)?,
        })
    }

    /// Creates a converter around a custom projector.
    pub fn with_projector(projector: Arc<dyn Projector>) -> Self {
        Self { projector }
    }

    /// EPSG code of the projected system.
    pub fn epsg(&self) -> u32 {
        self.projector.epsg()
    }

    /// Projects a WGS84 position.
    pub fn to_projected(&self, lng: f64, lat: f64) -> ProjectedPoint {
        let (x, y) = self.projector.to_projected(lng, lat);
        ProjectedPoint::new(x, y, self.epsg())
    }

    /// Projects a [`GeoPoint`].
    pub fn project(&self, point: GeoPoint) -> ProjectedPoint {
        self.to_projected(point.lng, point.lat)
    }

    /// Inverse-projects raw projected coordinates in this converter's system.
    pub fn to_geographic(&self, x: f64, y: f64) -> GeoPoint {
        let (lng, lat) = self.projector.to_geographic(x, y);
        GeoPoint::new(lng, lat)
    }

    /// Inverse-projects a tagged point, checking its EPSG code.
    pub fn unproject(&self, point: &ProjectedPoint) -> Result<GeoPoint, ProjectionError> {
        if point.epsg() != self.epsg() {
            return Err(ProjectionError::EpsgMismatch {
                expected: self.epsg(),
                actual: point.epsg(),
            });
        }
        Ok(self.to_geographic(point.x(), point.y()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_supported_codes() {
        for epsg in [4326, 3857, 900913, 32601, 32652, 32660, 32701, 32760, 5179, 5185, 5186, 5187, 5188] {
            let projector = projector_for_epsg(epsg).unwrap();
            assert_eq!(projector.epsg(), epsg);
        }
    }

    #[test]
    fn test_unsupported_projection() {
        for epsg in [0, 2097, 5174, 32600, 32661, 32700, 32761] {
            assert_eq!(
                CoordinateConverter::new(epsg).unwrap_err(),
                ProjectionError::UnsupportedProjection(epsg)
            );
        }
    }

    #[test]
    fn test_projected_point_is_tagged() {
        let converter = CoordinateConverter::new(5186).unwrap();
        let point = converter.to_projected(127.0, 38.0);
        assert_eq!(point.epsg(), 5186);
        assert!((point.x() - 200_000.0).abs() < 1e-6);
        assert!((point.y() - 600_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_unproject_rejects_foreign_points() {
        let korea = CoordinateConverter::new(5186).unwrap();
        let mercator = CoordinateConverter::new(3857).unwrap();
        let point = mercator.to_projected(127.0, 37.5);

        assert_eq!(
            korea.unproject(&point),
            Err(ProjectionError::EpsgMismatch {
                expected: 5186,
                actual: 3857
            })
        );
        let back = mercator.unproject(&point).unwrap();
        assert!((back.lng - 127.0).abs() < 1e-10);
        assert!((back.lat - 37.5).abs() < 1e-10);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProjectionError::UnsupportedProjection(2097).to_string(),
            "unsupported projection EPSG:2097"
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_korean_grids_roundtrip(
                offset in -2.0..2.0_f64,
                lat in 33.0..39.0_f64,
                grid in prop::sample::select(vec![
                    (5179u32, 127.5),
                    (5185, 125.0),
                    (5186, 127.0),
                    (5187, 129.0),
                    (5188, 131.0),
                ])
            ) {
                let (epsg, central_meridian) = grid;
                let lng = central_meridian + offset;
                let converter = CoordinateConverter::new(epsg).unwrap();
                let point = converter.to_projected(lng, lat);
                let back = converter.unproject(&point)?;
                prop_assert!((back.lng - lng).abs() < 1e-7, "lng {} -> {}", lng, back.lng);
                prop_assert!((back.lat - lat).abs() < 1e-7, "lat {} -> {}", lat, back.lat);
            }

            #[test]
            fn test_utm_roundtrip_inside_zone(
                zone in 1u32..=60,
                offset in -3.0..3.0_f64,
                lat in -80.0..84.0_f64
            ) {
                let north = lat >= 0.0;
                let epsg = if north { 32600 + zone } else { 32700 + zone };
                let converter = CoordinateConverter::new(epsg).unwrap();
                let lng = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0 + offset;

                let point = converter.to_projected(lng, lat);
                let back = converter.to_geographic(point.x(), point.y());
                // Series truncation grows toward the zone edges
                prop_assert!((back.lng - lng).abs() < 1e-6, "lng {} -> {}", lng, back.lng);
                prop_assert!((back.lat - lat).abs() < 1e-6, "lat {} -> {}", lat, back.lat);
            }
        }
    }
}

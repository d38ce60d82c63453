//! Spherical projections: geographic pass-through and Web Mercator.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::Projector;

/// Sphere radius used by EPSG:3857.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// EPSG:4326, coordinates stay in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geographic;

impl Projector for Geographic {
    fn epsg(&self) -> u32 {
        4326
    }

    fn to_projected(&self, lng: f64, lat: f64) -> (f64, f64) {
        (lng, lat)
    }

    fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}

/// EPSG:3857 pseudo-Mercator (also published as 900913).
///
/// Projected `y` is infinite at the poles; inputs should stay inside the
/// Web Mercator latitude cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebMercator {
    epsg: u32,
}

impl WebMercator {
    pub fn new() -> Self {
        Self { epsg: 3857 }
    }

    /// Same projection under a legacy alias code.
    pub fn with_code(epsg: u32) -> Self {
        Self { epsg }
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new()
    }
}

impl Projector for WebMercator {
    fn epsg(&self) -> u32 {
        self.epsg
    }

    fn to_projected(&self, lng: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS_M * lng.to_radians();
        let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        let lng = (x / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
        (lng, lat)
    }
}

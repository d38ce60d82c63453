//! Ground resolution and physical size of detections.
//!
//! Tile imagery has a fixed ground resolution per zoom level that shrinks
//! with the cosine of latitude. Detector boxes come back as fractions of the
//! input image, so turning them into centimetres needs both the ground
//! sample distance and the pixel size of the images the detector saw.
//! [`PixelScale`] keeps those two together.

use thiserror::Error;

use crate::coord::{CoordError, MAX_LAT, MAX_ZOOM};

/// Equatorial circumference in metres used by the resolution formula.
pub const EQUATORIAL_CIRCUMFERENCE_M: f64 = 40_075_016.686;

/// Pixel size of a standard slippy-map tile.
pub const STANDARD_TILE_SIZE_PX: u32 = 256;

/// Errors from converting pixel measurements to physical lengths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasurementError {
    /// Imagery tiles and detector input use different pixel sizes.
    #[error(
        "imagery tiles are {imagery}px but the detector input is {detector}px; \
         detection sizes would be scaled wrongly"
    )]
    MeasurementConfigMismatch { imagery: u32, detector: u32 },

    /// A normalized box dimension outside [0, 1].
    #[error("normalized size {0} is outside [0, 1]")]
    InvalidFraction(f64),

    /// Ground sample distance that is not a positive finite number.
    #[error("invalid ground sample distance {0} cm/px")]
    InvalidGsd(f64),

    /// Tile pixel size of zero.
    #[error("tile size must be at least one pixel")]
    InvalidTileSize,

    #[error(transparent)]
    Coord(#[from] CoordError),
}

fn check_domain(latitude: f64, zoom: u8) -> Result<(), CoordError> {
    if !(latitude.abs() < MAX_LAT) {
        return Err(CoordError::OutOfDomainLatitude(latitude));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(())
}

/// Ground sample distance in cm/px for 256-pixel tiles.
///
/// `C · cos(lat) / 2^(zoom + 8) · 100`. Each zoom step halves the result
/// exactly since the divisor is a power of two.
pub fn ground_sample_distance_cm(latitude: f64, zoom: u8) -> Result<f64, CoordError> {
    check_domain(latitude, zoom)?;
    let gsd_m =
        EQUATORIAL_CIRCUMFERENCE_M * latitude.to_radians().cos() / 2f64.powi(zoom as i32 + 8);
    Ok(gsd_m * 100.0)
}

/// Ground sample distance in cm/px for tiles rendered at `tile_size_px`.
///
/// Equal to [`ground_sample_distance_cm`] at 256 pixels.
pub fn ground_sample_distance_cm_for_tile_size(
    latitude: f64,
    zoom: u8,
    tile_size_px: u32,
) -> Result<f64, MeasurementError> {
    if tile_size_px == 0 {
        return Err(MeasurementError::InvalidTileSize);
    }
    let standard = ground_sample_distance_cm(latitude, zoom)?;
    Ok(standard * STANDARD_TILE_SIZE_PX as f64 / tile_size_px as f64)
}

/// Ground sample distance bound to the pixel size of the images measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    gsd_cm: f64,
    tile_size_px: u32,
}

impl PixelScale {
    pub fn new(gsd_cm: f64, tile_size_px: u32) -> Result<Self, MeasurementError> {
        if !gsd_cm.is_finite() || gsd_cm <= 0.0 {
            return Err(MeasurementError::InvalidGsd(gsd_cm));
        }
        if tile_size_px == 0 {
            return Err(MeasurementError::InvalidTileSize);
        }
        Ok(Self {
            gsd_cm,
            tile_size_px,
        })
    }

    /// Scale for detector output, checking that the detector ran on images
    /// of the same pixel size as the imagery tiles.
    pub fn for_detector(
        gsd_cm: f64,
        imagery_tile_px: u32,
        detector_input_px: u32,
    ) -> Result<Self, MeasurementError> {
        if imagery_tile_px != detector_input_px {
            return Err(MeasurementError::MeasurementConfigMismatch {
                imagery: imagery_tile_px,
                detector: detector_input_px,
            });
        }
        Self::new(gsd_cm, imagery_tile_px)
    }

    /// Scale for `tile_size_px` imagery at a latitude and zoom.
    pub fn at(latitude: f64, zoom: u8, tile_size_px: u32) -> Result<Self, MeasurementError> {
        let gsd = ground_sample_distance_cm_for_tile_size(latitude, zoom, tile_size_px)?;
        Self::new(gsd, tile_size_px)
    }

    pub fn gsd_cm(&self) -> f64 {
        self.gsd_cm
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    /// Ground width of one tile in centimetres.
    pub fn tile_width_cm(&self) -> f64 {
        self.tile_size_px as f64 * self.gsd_cm
    }

    /// Diagonal in cm of a box given as fractions of the tile size.
    pub fn diagonal_length_cm(
        &self,
        width_fraction: f64,
        height_fraction: f64,
    ) -> Result<f64, MeasurementError> {
        for fraction in [width_fraction, height_fraction] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(MeasurementError::InvalidFraction(fraction));
            }
        }
        let width_cm = width_fraction * self.tile_width_cm();
        let height_cm = height_fraction * self.tile_width_cm();
        Ok(width_cm.hypot(height_cm))
    }
}

/// Diagonal in cm of a normalized box on `tile_size_px` imagery.
pub fn diagonal_length_cm(
    width_fraction: f64,
    height_fraction: f64,
    gsd_cm: f64,
    tile_size_px: u32,
) -> Result<f64, MeasurementError> {
    PixelScale::new(gsd_cm, tile_size_px)?.diagonal_length_cm(width_fraction, height_fraction)
}

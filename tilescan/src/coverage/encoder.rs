//! Storage keys and download plans for covered tiles.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::{coverage_with, CoverageError, Polygon};
use crate::coord::{CoordError, GeoPoint, TileCoord, TileIndexConverter};
use crate::crs::CoordinateConverter;

/// Extension of downloaded tile images.
pub const LOCAL_IMAGE_EXTENSION: &str = "png";

/// Formats a coordinate the way existing tile names spell it.
///
/// Shortest round-trip digits. Whole numbers keep a trailing `.0`, and
/// magnitudes below 1e-4 or from 1e16 up use exponent form with a signed
/// two-digit exponent (`4.291534423828125e-05`). Detector output is matched
/// back to tiles through these names, so they must parse back to the same
/// `f64`.
pub(crate) fn format_coordinate(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// One tile to fetch: where it lives in storage and what to call it locally.
#[derive(Debug, Clone, PartialEq)]
pub struct TileJob {
    pub tile: TileCoord,
    /// Object storage key
    pub key: String,
    /// Local file name, `{lng}_{lat}.png`
    pub file_name: String,
    /// Geographic center encoded in `file_name`
    pub center: GeoPoint,
}

/// An area dropped from a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedArea {
    /// Position of the area in the request
    pub index: usize,
    pub error: CoverageError,
}

/// Tiles to fetch for a multi-area request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoveragePlan {
    pub zoom: u8,
    /// One job per covered tile, ordered by tile
    pub jobs: Vec<TileJob>,
    pub skipped: Vec<SkippedArea>,
}

impl CoveragePlan {
    pub fn tile_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.jobs.iter().map(|job| job.tile)
    }
}

/// Maps covered tiles to storage keys under a root prefix.
///
/// Storage keys follow `{root}/{zoom}/{x}/{y}`, optionally with a file
/// extension. Local names are derived from the tile center instead.
#[derive(Debug, Clone)]
pub struct TmsPathEncoder {
    root: String,
    tiles: TileIndexConverter,
    crs: CoordinateConverter,
    extension: Option<String>,
}

impl TmsPathEncoder {
    /// Creates an encoder for areas given in `epsg` at `zoom`.
    ///
    /// # Errors
    ///
    /// Fails if the zoom is out of range or the projection is unknown.
    pub fn new(root: impl Into<String>, epsg: u32, zoom: u8) -> Result<Self, CoverageError> {
        let root = root.into();
        Ok(Self {
            root: root.trim_end_matches('/').to_string(),
            tiles: TileIndexConverter::new(zoom)?,
            crs: CoordinateConverter::new(epsg)?,
            extension: None,
        })
    }

    /// Appends `.{extension}` to storage keys. An empty string disables it.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.');
        self.extension = if extension.is_empty() {
            None
        } else {
            Some(extension.to_string())
        };
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn zoom(&self) -> u8 {
        self.tiles.zoom()
    }

    pub fn epsg(&self) -> u32 {
        self.crs.epsg()
    }

    pub fn converter(&self) -> &CoordinateConverter {
        &self.crs
    }

    /// Bare path `{root}/{zoom}/{x}/{y}`.
    pub fn tile_key(&self, tile: &TileCoord) -> String {
        format!("{}/{}/{}/{}", self.root, tile.zoom, tile.x, tile.y)
    }

    /// Storage key, the tile path plus the configured extension.
    pub fn object_key(&self, tile: &TileCoord) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{}", self.tile_key(tile), ext),
            None => self.tile_key(tile),
        }
    }

    /// Local file name `{lng}_{lat}.png` built from the tile center.
    pub fn local_name(&self, tile: &TileCoord) -> Result<String, CoordError> {
        let center = self.tiles.center_of(tile)?;
        Ok(local_name_for(center))
    }

    /// Projects a lng/lat ring into the encoder's coordinate system.
    pub fn polygon_from_ring(&self, ring: &[GeoPoint]) -> Result<Polygon, CoverageError> {
        let vertices: Vec<_> = ring.iter().map(|&p| self.crs.project(p)).collect();
        Ok(Polygon::new(&vertices)?)
    }

    /// Tiles overlapping one lng/lat ring.
    pub fn cover_ring(&self, ring: &[GeoPoint]) -> Result<BTreeSet<TileCoord>, CoverageError> {
        let polygon = self.polygon_from_ring(ring)?;
        coverage_with(&polygon, &self.tiles, &self.crs)
    }

    /// Builds the job for one tile.
    pub fn job(&self, tile: TileCoord) -> Result<TileJob, CoordError> {
        let center = self.tiles.center_of(&tile)?;
        Ok(TileJob {
            tile,
            key: self.object_key(&tile),
            file_name: local_name_for(center),
            center,
        })
    }

    /// Plans downloads for every area of a request.
    ///
    /// Areas that are not valid polygons, or that reach outside the Mercator
    /// domain, are skipped and listed in [`CoveragePlan::skipped`]. The plan
    /// fails only if every area was skipped.
    pub fn plan(&self, areas: &[Vec<GeoPoint>]) -> Result<CoveragePlan, CoverageError> {
        let mut covered = BTreeSet::new();
        let mut skipped = Vec::new();

        for (index, ring) in areas.iter().enumerate() {
            match self.cover_ring(ring) {
                Ok(tiles) => {
                    debug!(area = index, tiles = tiles.len(), "Area covered");
                    covered.extend(tiles);
                }
                Err(error @ (CoverageError::InvalidPolygon(_) | CoverageError::Coord(_))) => {
                    warn!(area = index, error = %error, "Skipping area");
                    skipped.push(SkippedArea { index, error });
                }
                Err(other) => return Err(other),
            }
        }

        if !areas.is_empty() && skipped.len() == areas.len() {
            return Err(CoverageError::NoValidArea {
                skipped: skipped.len(),
            });
        }

        let jobs = covered
            .into_iter()
            .map(|tile| self.job(tile))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            zoom = self.zoom(),
            areas = areas.len(),
            tiles = jobs.len(),
            skipped = skipped.len(),
            "Coverage plan ready"
        );

        Ok(CoveragePlan {
            zoom: self.zoom(),
            jobs,
            skipped,
        })
    }
}

fn local_name_for(center: GeoPoint) -> String {
    format!(
        "{}_{}.{}",
        format_coordinate(center.lng),
        format_coordinate(center.lat),
        LOCAL_IMAGE_EXTENSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::PolygonDefect;

    fn ring(points: &[(f64, f64)]) -> Vec<GeoPoint> {
        points.iter().map(|&(lng, lat)| GeoPoint::new(lng, lat)).collect()
    }

    fn seoul_block() -> Vec<GeoPoint> {
        ring(&[
            (126.9770, 37.5660),
            (126.9790, 37.5660),
            (126.9790, 37.5672),
            (126.9770, 37.5672),
        ])
    }

    #[test]
    fn test_tile_key_layout() {
        let encoder = TmsPathEncoder::new("public/16/manifold/orthomosaic_tiles/", 5186, 19).unwrap();
        let tile = TileCoord::new(19, 447101, 321134).unwrap();

        assert_eq!(encoder.root(), "public/16/manifold/orthomosaic_tiles");
        assert_eq!(
            encoder.tile_key(&tile),
            "public/16/manifold/orthomosaic_tiles/19/447101/321134"
        );
        assert_eq!(encoder.object_key(&tile), encoder.tile_key(&tile));
    }

    #[test]
    fn test_object_key_extension() {
        let tile = TileCoord::new(3, 1, 2).unwrap();
        let png = TmsPathEncoder::new("root", 4326, 3).unwrap().with_extension(".png");
        assert_eq!(png.object_key(&tile), "root/3/1/2.png");

        let bare = png.with_extension("");
        assert_eq!(bare.object_key(&tile), "root/3/1/2");
    }

    #[test]
    fn test_local_name_from_center() {
        let encoder = TmsPathEncoder::new("root", 4326, 19).unwrap();
        let tile = TileCoord::new(19, 447101, 321134).unwrap();
        assert_eq!(
            encoder.local_name(&tile).unwrap(),
            "127.00023651123047_37.50019330682214.png"
        );
    }

    #[test]
    fn test_local_name_rejects_other_zoom() {
        let encoder = TmsPathEncoder::new("root", 4326, 10).unwrap();
        let tile = TileCoord::new(11, 0, 0).unwrap();
        assert_eq!(encoder.local_name(&tile), Err(CoordError::InvalidZoom(11)));
    }

    #[test]
    fn test_format_coordinate_keeps_decimal_point() {
        assert_eq!(format_coordinate(127.0), "127.0");
        assert_eq!(format_coordinate(-3.0), "-3.0");
        assert_eq!(format_coordinate(0.5), "0.5");
        assert_eq!(format_coordinate(-0.000123), "-0.000123");
        assert_eq!(format_coordinate(0.0), "0.0");
        assert_eq!(format_coordinate(-0.0), "-0.0");
        assert_eq!(format_coordinate(0.0001), "0.0001");
        assert_eq!(format_coordinate(123456789012345.6), "123456789012345.6");
    }

    #[test]
    fn test_format_coordinate_exponent_form() {
        assert_eq!(format_coordinate(1e-5), "1e-05");
        assert_eq!(format_coordinate(2.5e-7), "2.5e-07");
        assert_eq!(format_coordinate(-4.291534423828125e-5), "-4.291534423828125e-05");
        assert_eq!(format_coordinate(1e16), "1e+16");
    }

    #[test]
    fn test_local_name_near_null_island() {
        let encoder = TmsPathEncoder::new("root", 4326, 22).unwrap();
        let tile = TileCoord::new(22, 1 << 21, 1 << 21).unwrap();
        let name = encoder.local_name(&tile).unwrap();
        assert_eq!(name, "4.291534423828125e-05_4.29153442382652e-05.png");

        let stem = name.trim_end_matches(".png");
        let center = encoder.tiles.center_of(&tile).unwrap();
        assert_eq!(crate::detection::point_from_file_stem(stem), Some(center));
    }

    #[test]
    fn test_unsupported_projection() {
        assert!(matches!(
            TmsPathEncoder::new("root", 2097, 19),
            Err(CoverageError::Projection(_))
        ));
    }

    #[test]
    fn test_plan_jobs_match_coverage() {
        let encoder = TmsPathEncoder::new("root", 5186, 19).unwrap();
        let area = seoul_block();
        let plan = encoder.plan(&[area.clone()]).unwrap();
        let tiles = encoder.cover_ring(&area).unwrap();

        assert_eq!(plan.zoom, 19);
        assert!(plan.skipped.is_empty());
        assert_eq!(plan.tiles().collect::<BTreeSet<_>>(), tiles);
        for job in &plan.jobs {
            assert_eq!(job.key, encoder.object_key(&job.tile));
            assert_eq!(job.file_name, encoder.local_name(&job.tile).unwrap());
        }
    }

    #[test]
    fn test_plan_unions_overlapping_areas() {
        let encoder = TmsPathEncoder::new("root", 4326, 18).unwrap();
        let a = seoul_block();
        let shifted: Vec<_> = a
            .iter()
            .map(|p| GeoPoint::new(p.lng + 0.0005, p.lat))
            .collect();

        let plan = encoder.plan(&[a.clone(), shifted.clone()]).unwrap();
        let mut expected = encoder.cover_ring(&a).unwrap();
        expected.extend(encoder.cover_ring(&shifted).unwrap());

        assert_eq!(plan.tile_count(), expected.len());
        let keys: BTreeSet<_> = plan.jobs.iter().map(|j| j.key.clone()).collect();
        assert_eq!(keys.len(), plan.tile_count());
    }

    #[test]
    fn test_plan_skips_invalid_area() {
        let encoder = TmsPathEncoder::new("root", 5186, 18).unwrap();
        let bowtie = ring(&[(127.0, 37.5), (127.01, 37.51), (127.01, 37.5), (127.0, 37.51)]);

        let plan = encoder.plan(&[seoul_block(), bowtie]).unwrap();
        assert!(!plan.is_empty());
        assert_eq!(
            plan.skipped,
            vec![SkippedArea {
                index: 1,
                error: CoverageError::InvalidPolygon(PolygonDefect::SelfIntersecting),
            }]
        );
    }

    #[test]
    fn test_plan_fails_when_every_area_is_invalid() {
        let encoder = TmsPathEncoder::new("root", 5186, 18).unwrap();
        let line = ring(&[(127.0, 37.5), (127.01, 37.51)]);
        let polar = ring(&[(0.0, 86.0), (1.0, 86.0), (1.0, 87.0)]);

        assert_eq!(
            TmsPathEncoder::new("root", 4326, 10).unwrap().plan(&[polar]),
            Err(CoverageError::NoValidArea { skipped: 1 })
        );
        assert_eq!(
            encoder.plan(&[line.clone(), line]),
            Err(CoverageError::NoValidArea { skipped: 2 })
        );
    }

    #[test]
    fn test_empty_request_gives_empty_plan() {
        let encoder = TmsPathEncoder::new("root", 5186, 18).unwrap();
        let plan = encoder.plan(&[]).unwrap();
        assert!(plan.is_empty());
        assert!(plan.skipped.is_empty());
    }
}

//! Transverse Mercator on an ellipsoid (USGS series formulas).
//!
//! Forward and inverse follow Snyder, *Map Projections: A Working Manual*
//! (USGS Professional Paper 1395), equations 8-9 to 8-25. Accuracy is well
//! under a millimetre within a few degrees of the central meridian, which
//! covers UTM zones and the Korean national belts.

use super::Projector;

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }

    /// Second eccentricity squared.
    pub fn ep2(&self) -> f64 {
        let e2 = self.e2();
        e2 / (1.0 - e2)
    }

    /// Meridional arc length from the equator to `lat` (radians). Snyder 3-21.
    fn meridional_arc(&self, lat: f64) -> f64 {
        let e2 = self.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }
}

/// A transverse Mercator grid definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    epsg: u32,
    ellipsoid: Ellipsoid,
    /// Latitude of origin, degrees
    lat0: f64,
    /// Central meridian, degrees
    lon0: f64,
    /// Scale factor on the central meridian
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    /// Creates a grid from its defining parameters.
    pub fn new(
        epsg: u32,
        ellipsoid: Ellipsoid,
        lat0: f64,
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            epsg,
            ellipsoid,
            lat0,
            lon0,
            k0,
            false_easting,
            false_northing,
        }
    }

    /// WGS84 UTM zone (1 to 60) in the given hemisphere.
    pub fn utm(zone: u32, north: bool) -> Self {
        let epsg = if north { 32600 + zone } else { 32700 + zone };
        let lon0 = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;
        let false_northing = if north { 0.0 } else { 10_000_000.0 };
        Self::new(
            epsg,
            Ellipsoid::WGS84,
            0.0,
            lon0,
            0.9996,
            500_000.0,
            false_northing,
        )
    }

    /// Korea 2000 belt (EPSG 5185 to 5188) with central meridian `lon0`.
    pub fn korea_belt(epsg: u32, lon0: f64) -> Self {
        Self::new(
            epsg,
            Ellipsoid::GRS80,
            38.0,
            lon0,
            1.0,
            200_000.0,
            600_000.0,
        )
    }

    /// Korea 2000 Unified CS (EPSG 5179).
    pub fn korea_unified() -> Self {
        Self::new(
            5179,
            Ellipsoid::GRS80,
            38.0,
            127.5,
            0.9996,
            1_000_000.0,
            2_000_000.0,
        )
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.lon0
    }
}

impl Projector for TransverseMercator {
    fn epsg(&self) -> u32 {
        self.epsg
    }

    fn to_projected(&self, lng: f64, lat: f64) -> (f64, f64) {
        let e = &self.ellipsoid;
        let e2 = e.e2();
        let ep2 = e.ep2();

        let phi = lat.to_radians();
        let (sin_phi, cos_phi, tan_phi) = (phi.sin(), phi.cos(), phi.tan());

        let n = e.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lng - self.lon0).to_radians();

        let m = e.meridional_arc(phi);
        let m0 = e.meridional_arc(self.lat0.to_radians());

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a2 * a2;
        let a5 = a4 * a;
        let a6 = a4 * a2;

        let x = self.false_easting
            + self.k0
                * n
                * (a + (1.0 - t + c) * a3 / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);

        let y = self.false_northing
            + self.k0
                * (m - m0
                    + n * tan_phi
                        * (a2 / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        (x, y)
    }

    fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        let e = &self.ellipsoid;
        let e2 = e.e2();
        let ep2 = e.ep2();

        // Footpoint latitude
        let m = e.meridional_arc(self.lat0.to_radians()) + (y - self.false_northing) / self.k0;
        let mu = m / (e.a * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));
        let root = (1.0 - e2).sqrt();
        let e1 = (1.0 - root) / (1.0 + root);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = e.a / w.sqrt();
        let r1 = e.a * (1.0 - e2) / w.powf(1.5);
        let d = (x - self.false_easting) / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d2 * d2;
        let d5 = d4 * d;
        let d6 = d4 * d2;

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lambda = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos1;

        (self.lon0 + lambda.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff < tol,
            "{what}: expected {expected}, got {actual}, diff {diff} exceeds {tol}"
        );
    }

    // Reference values from PROJ:
    //   Transformer.from_crs(4326, 32630, always_xy=True).transform(-3.7037, 40.4168)
    #[test]
    fn test_madrid_utm_30n() {
        let (x, y) = TransverseMercator::utm(30, true).to_projected(-3.7037, 40.4168);
        assert_close(x, 440_298.94, 0.05, "easting");
        assert_close(y, 4_474_257.31, 0.05, "northing");
    }

    #[test]
    fn test_buenos_aires_utm_21s() {
        let (x, y) = TransverseMercator::utm(21, false).to_projected(-58.3816, -34.6037);
        assert_close(x, 373_317.50, 0.05, "easting");
        assert_close(y, 6_170_036.17, 0.05, "northing");
    }

    #[test]
    fn test_central_belt_origin() {
        let tm = TransverseMercator::korea_belt(5186, 127.0);
        let (x, y) = tm.to_projected(127.0, 38.0);
        assert_close(x, 200_000.0, 1e-6, "easting at origin");
        assert_close(y, 600_000.0, 1e-6, "northing at origin");
    }

    #[test]
    fn test_seoul_city_hall_central_belt() {
        let tm = TransverseMercator::korea_belt(5186, 127.0);
        let (x, y) = tm.to_projected(126.978, 37.5665);
        assert_close(x, 198_056.37, 0.05, "easting");
        assert_close(y, 551_885.03, 0.05, "northing");
    }

    #[test]
    fn test_inverse_recovers_input() {
        let cases = [
            (TransverseMercator::utm(30, true), -3.7037, 40.4168),
            (TransverseMercator::utm(21, false), -58.3816, -34.6037),
            (TransverseMercator::utm(52, true), 129.0, 35.1),
            (TransverseMercator::korea_belt(5186, 127.0), 126.978, 37.5665),
            (TransverseMercator::korea_unified(), 128.6, 35.87),
        ];

        for (tm, lng, lat) in cases {
            let (x, y) = tm.to_projected(lng, lat);
            let (lng2, lat2) = tm.to_geographic(x, y);
            assert_close(lng2, lng, 1e-8, "longitude");
            assert_close(lat2, lat, 1e-8, "latitude");
        }
    }

    #[test]
    fn test_utm_epsg_codes() {
        assert_eq!(TransverseMercator::utm(52, true).epsg(), 32652);
        assert_eq!(TransverseMercator::utm(21, false).epsg(), 32721);
        assert_eq!(TransverseMercator::utm(31, true).central_meridian(), 3.0);
    }
}

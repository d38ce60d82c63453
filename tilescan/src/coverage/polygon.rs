//! Projected polygons and the planar predicates used by the coverage test.
//!
//! All predicates are inclusive: touching counts as intersecting and a point
//! on an edge counts as inside.

use std::fmt;

use crate::crs::ProjectedPoint;

/// Reason a vertex ring was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolygonDefect {
    /// Fewer than three distinct vertices.
    TooFewVertices(usize),
    /// A coordinate is NaN or infinite.
    NonFinite,
    /// Vertices come from different coordinate systems.
    MixedEpsg { first: u32, other: u32 },
    /// The ring encloses no area.
    ZeroArea,
    /// Two non-adjacent edges touch or cross.
    SelfIntersecting,
}

impl fmt::Display for PolygonDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonDefect::TooFewVertices(n) => {
                write!(f, "{} distinct vertices, at least 3 required", n)
            }
            PolygonDefect::NonFinite => write!(f, "non-finite coordinate"),
            PolygonDefect::MixedEpsg { first, other } => {
                write!(f, "vertices mix EPSG:{} and EPSG:{}", first, other)
            }
            PolygonDefect::ZeroArea => write!(f, "ring has zero area"),
            PolygonDefect::SelfIntersecting => write!(f, "ring intersects itself"),
        }
    }
}

/// Planar point used by the predicates.
pub(crate) type Xy = (f64, f64);

/// Axis-aligned bounding box in projected units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    fn of(points: &[Xy]) -> Self {
        let mut bbox = BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &(x, y) in points {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    /// Corners in ring order starting at (min_x, min_y).
    pub fn corners(&self) -> [Xy; 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }

    /// True if the two boxes overlap or touch.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// A simple closed ring of projected vertices.
///
/// The closing edge is implicit: a duplicated final vertex is dropped on
/// construction. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    epsg: u32,
    ring: Vec<Xy>,
    bbox: BoundingBox,
}

impl Polygon {
    /// Validates and builds a polygon from tagged vertices.
    pub fn new(vertices: &[ProjectedPoint]) -> Result<Self, PolygonDefect> {
        let Some(first) = vertices.first() else {
            return Err(PolygonDefect::TooFewVertices(0));
        };
        let epsg = first.epsg();
        if let Some(other) = vertices.iter().find(|v| v.epsg() != epsg) {
            return Err(PolygonDefect::MixedEpsg {
                first: epsg,
                other: other.epsg(),
            });
        }

        let points: Vec<Xy> = vertices.iter().map(|v| (v.x(), v.y())).collect();
        Self::from_xy(&points, epsg)
    }

    /// Validates and builds a polygon from raw coordinates in `epsg`.
    pub fn from_xy(points: &[Xy], epsg: u32) -> Result<Self, PolygonDefect> {
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(PolygonDefect::NonFinite);
        }

        let mut ring: Vec<Xy> = Vec::with_capacity(points.len());
        for &p in points {
            if ring.last() != Some(&p) {
                ring.push(p);
            }
        }
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        if ring.len() < 3 {
            return Err(PolygonDefect::TooFewVertices(ring.len()));
        }
        // A bowtie can have zero signed area, so simplicity is checked first
        if is_self_intersecting(&ring) {
            return Err(PolygonDefect::SelfIntersecting);
        }
        if signed_area(&ring) == 0.0 {
            return Err(PolygonDefect::ZeroArea);
        }

        let bbox = BoundingBox::of(&ring);
        Ok(Self { epsg, ring, bbox })
    }

    /// EPSG code shared by all vertices.
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Vertices without the closing duplicate.
    pub fn vertices(&self) -> Vec<ProjectedPoint> {
        self.ring
            .iter()
            .map(|&(x, y)| ProjectedPoint::new(x, y, self.epsg))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// True if `p` is inside the polygon or on its boundary.
    pub fn contains(&self, p: Xy) -> bool {
        point_in_ring(p, &self.ring)
    }

    /// True if the ring `other` overlaps this polygon's interior or boundary.
    pub(crate) fn intersects_ring(&self, other: &[Xy]) -> bool {
        if !self.bbox.overlaps(&BoundingBox::of(other)) {
            return false;
        }
        rings_intersect(&self.ring, other)
    }
}

/// Twice the signed area (shoelace).
fn signed_area(ring: &[Xy]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum()
}

/// Cross product of (b - a) × (c - a).
#[inline]
fn orient(a: Xy, b: Xy, c: Xy) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// `p` is within the bounding box of segment `a`-`b` (assumes collinearity).
#[inline]
fn within_segment_box(a: Xy, b: Xy, p: Xy) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

#[inline]
fn on_segment(a: Xy, b: Xy, p: Xy) -> bool {
    orient(a, b, p) == 0.0 && within_segment_box(a, b, p)
}

/// Closed-segment intersection, touching included.
pub(crate) fn segments_intersect(p1: Xy, p2: Xy, q1: Xy, q2: Xy) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && within_segment_box(q1, q2, p1))
        || (d2 == 0.0 && within_segment_box(q1, q2, p2))
        || (d3 == 0.0 && within_segment_box(p1, p2, q1))
        || (d4 == 0.0 && within_segment_box(p1, p2, q2))
}

/// Even-odd point-in-ring test, boundary inclusive.
pub(crate) fn point_in_ring(p: Xy, ring: &[Xy]) -> bool {
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if on_segment(a, b, p) {
            return true;
        }
        if (a.1 > p.1) != (b.1 > p.1) {
            let x_cross = a.0 + (p.1 - a.1) / (b.1 - a.1) * (b.0 - a.0);
            if p.0 < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn edges(ring: &[Xy]) -> impl Iterator<Item = (Xy, Xy)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Two simple rings intersect iff a vertex of one lies in the other or two
/// edges meet.
pub(crate) fn rings_intersect(a: &[Xy], b: &[Xy]) -> bool {
    a.iter().any(|&p| point_in_ring(p, b))
        || b.iter().any(|&p| point_in_ring(p, a))
        || edges(a).any(|(a1, a2)| edges(b).any(|(b1, b2)| segments_intersect(a1, a2, b1, b2)))
}

fn is_self_intersecting(ring: &[Xy]) -> bool {
    let n = ring.len();
    for i in 0..n {
        let (a1, a2) = (ring[i], ring[(i + 1) % n]);
        for j in (i + 1)..n {
            // Adjacent edges share a vertex by construction
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (ring[j], ring[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Xy> {
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
    }

    #[test]
    fn test_accepts_simple_ring() {
        let polygon = Polygon::from_xy(&square(), 3857).unwrap();
        assert_eq!(polygon.len(), 4);
        assert_eq!(polygon.epsg(), 3857);
        assert_eq!(
            polygon.bounding_box(),
            BoundingBox {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 10.0,
                max_y: 10.0
            }
        );
    }

    #[test]
    fn test_drops_closing_vertex() {
        let mut closed = square();
        closed.push((0.0, 0.0));
        let polygon = Polygon::from_xy(&closed, 3857).unwrap();
        assert_eq!(polygon.len(), 4);
    }

    #[test]
    fn test_rejects_too_few_vertices() {
        assert_eq!(
            Polygon::from_xy(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)], 4326),
            Err(PolygonDefect::TooFewVertices(2))
        );
        assert_eq!(Polygon::new(&[]), Err(PolygonDefect::TooFewVertices(0)));
    }

    #[test]
    fn test_rejects_collinear_ring() {
        assert_eq!(
            Polygon::from_xy(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)], 4326),
            Err(PolygonDefect::ZeroArea)
        );
    }

    #[test]
    fn test_rejects_bowtie() {
        let bowtie = [(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)];
        assert_eq!(
            Polygon::from_xy(&bowtie, 4326),
            Err(PolygonDefect::SelfIntersecting)
        );
    }

    #[test]
    fn test_rejects_non_finite() {
        let ring = [(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0)];
        assert_eq!(Polygon::from_xy(&ring, 4326), Err(PolygonDefect::NonFinite));
    }

    #[test]
    fn test_rejects_mixed_epsg() {
        let vertices = [
            ProjectedPoint::new(0.0, 0.0, 5186),
            ProjectedPoint::new(1.0, 0.0, 5186),
            ProjectedPoint::new(1.0, 1.0, 3857),
        ];
        assert_eq!(
            Polygon::new(&vertices),
            Err(PolygonDefect::MixedEpsg {
                first: 5186,
                other: 3857
            })
        );
    }

    #[test]
    fn test_point_in_ring_is_boundary_inclusive() {
        let polygon = Polygon::from_xy(&square(), 3857).unwrap();
        assert!(polygon.contains((5.0, 5.0)));
        assert!(polygon.contains((0.0, 5.0)));
        assert!(polygon.contains((10.0, 10.0)));
        assert!(!polygon.contains((10.5, 5.0)));
        assert!(!polygon.contains((-0.1, -0.1)));
    }

    #[test]
    fn test_point_in_concave_ring() {
        // U shape open to the north
        let u = [
            (0.0, 0.0),
            (9.0, 0.0),
            (9.0, 9.0),
            (6.0, 9.0),
            (6.0, 3.0),
            (3.0, 3.0),
            (3.0, 9.0),
            (0.0, 9.0),
        ];
        let polygon = Polygon::from_xy(&u, 3857).unwrap();
        assert!(polygon.contains((1.0, 8.0)));
        assert!(!polygon.contains((4.5, 6.0)));
    }

    #[test]
    fn test_segments_intersect_cases() {
        // Crossing
        assert!(segments_intersect((0.0, 0.0), (2.0, 2.0), (0.0, 2.0), (2.0, 0.0)));
        // Touching at an endpoint
        assert!(segments_intersect((0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 5.0)));
        // Collinear overlap
        assert!(segments_intersect((0.0, 0.0), (2.0, 0.0), (1.0, 0.0), (3.0, 0.0)));
        // Disjoint parallel
        assert!(!segments_intersect((0.0, 0.0), (2.0, 0.0), (0.0, 1.0), (2.0, 1.0)));
        // Collinear but apart
        assert!(!segments_intersect((0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)));
    }

    #[test]
    fn test_sliver_crossing_square_intersects() {
        // A thin sliver passes through a square without any vertex inside it
        let polygon =
            Polygon::from_xy(&[(-5.0, 4.9), (15.0, 4.9), (15.0, 5.1), (-5.0, 5.1)], 3857).unwrap();
        assert!(polygon.intersects_ring(&square()));
        assert!(!polygon.intersects_ring(&[(0.0, 6.0), (1.0, 6.0), (1.0, 7.0), (0.0, 7.0)]));
    }

    #[test]
    fn test_ring_containing_polygon_intersects() {
        let polygon = Polygon::from_xy(&[(4.0, 4.0), (6.0, 4.0), (5.0, 6.0)], 3857).unwrap();
        assert!(polygon.intersects_ring(&square()));
    }
}

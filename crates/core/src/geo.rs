//! Delivery service area.
//!
//! The service area is a hand-drawn polygon of latitude/longitude vertices.
//! [`ServiceArea::contains`] uses the even-odd ray-casting rule: a horizontal
//! ray from the point flips `inside` each time it crosses an edge.
//!
//! # Known limitation
//!
//! Points lying exactly on an edge or vertex get an implementation-defined
//! answer. The boundary is drawn by hand around streets, so a geocoded
//! address landing precisely on it is not a practical concern.
//!
//! Self-intersecting polygons are not rejected; the even-odd rule still
//! answers, but the answer is only meaningful for simple polygons.

use serde::{Deserialize, Serialize};

/// Errors raised when building a [`ServiceArea`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Fewer than three distinct vertices.
    #[error("service area polygon needs at least 3 distinct vertices (got {0})")]
    InvalidPolygon(usize),
    /// A vertex has a NaN/infinite or out-of-range coordinate.
    #[error("invalid coordinate at vertex {index}: ({lat}, {lng})")]
    InvalidCoordinate {
        /// Vertex position in the input.
        index: usize,
        /// Latitude as given.
        lat: f64,
        /// Longitude as given.
        lng: f64,
    },
}

/// A geographic point in floating-point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (the `y` axis for ray casting).
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// Longitude in degrees (the `x` axis for ray casting).
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Axis-aligned bounding box of a service area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    /// Whether the point lies within the box (inclusive).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
    }
}

/// A validated delivery service area.
///
/// Vertex order defines the edges. The polygon is implicitly closed; a
/// closing vertex equal to the first one is accepted and dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceArea {
    vertices: Vec<GeoPoint>,
}

impl ServiceArea {
    /// Build a service area from its vertices.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::InvalidCoordinate` for non-finite or out-of-range
    /// coordinates and `GeoError::InvalidPolygon` when fewer than three
    /// distinct vertices remain after dropping the closing vertex.
    pub fn new(points: Vec<GeoPoint>) -> Result<Self, GeoError> {
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(GeoError::InvalidCoordinate {
                index,
                lat: p.latitude,
                lng: p.longitude,
            });
        }

        let mut vertices = points;
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        if vertices.len() < 3 {
            return Err(GeoError::InvalidPolygon(vertices.len()));
        }

        Ok(Self { vertices })
    }

    /// The polygon vertices, without a repeated closing vertex.
    #[must_use]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    /// Even-odd point-in-polygon test.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        ray_cast(point, &self.vertices)
    }

    /// Bounding box of all vertices.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let mut south_west = GeoPoint::new(f64::INFINITY, f64::INFINITY);
        let mut north_east = GeoPoint::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            south_west.latitude = south_west.latitude.min(v.latitude);
            south_west.longitude = south_west.longitude.min(v.longitude);
            north_east.latitude = north_east.latitude.max(v.latitude);
            north_east.longitude = north_east.longitude.max(v.longitude);
        }
        BoundingBox {
            south_west,
            north_east,
        }
    }

    /// Vertex average, used by clients to centre a map on the area.
    #[must_use]
    pub fn centroid(&self) -> GeoPoint {
        #[allow(clippy::cast_precision_loss)] // vertex counts are tiny
        let n = self.vertices.len() as f64;
        let (lat, lng) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(lat, lng), v| (lat + v.latitude, lng + v.longitude));
        GeoPoint::new(lat / n, lng / n)
    }
}

impl TryFrom<Vec<GeoPoint>> for ServiceArea {
    type Error = GeoError;

    fn try_from(points: Vec<GeoPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

/// Decide whether `point` lies inside `polygon`.
///
/// Convenience wrapper for callers holding raw vertices rather than a
/// validated [`ServiceArea`]. The vertices are validated the same way.
///
/// # Errors
///
/// Any error from [`ServiceArea::new`].
pub fn is_serviceable(point: GeoPoint, polygon: &[GeoPoint]) -> Result<bool, GeoError> {
    Ok(ServiceArea::new(polygon.to_vec())?.contains(point))
}

fn ray_cast(point: GeoPoint, polygon: &[GeoPoint]) -> bool {
    let (x, y) = (point.longitude, point.latitude);
    let Some(mut prev) = polygon.last().copied() else {
        return false;
    };

    let mut inside = false;
    for &curr in polygon {
        let (xi, yi) = (curr.longitude, curr.latitude);
        let (xj, yj) = (prev.longitude, prev.latitude);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        prev = curr;
    }

    inside
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square() -> ServiceArea {
        ServiceArea::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(10.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_points_inside_convex_polygon() {
        let area = square();
        for lat in 1..10 {
            for lng in 1..10 {
                let p = GeoPoint::new(f64::from(lat), f64::from(lng));
                assert!(area.contains(p), "{p:?} should be inside");
            }
        }
    }

    #[test]
    fn test_points_far_outside_bounding_box() {
        let area = square();
        for p in [
            GeoPoint::new(-50.0, 5.0),
            GeoPoint::new(50.0, 5.0),
            GeoPoint::new(5.0, -50.0),
            GeoPoint::new(5.0, 50.0),
            GeoPoint::new(80.0, 170.0),
        ] {
            assert!(!area.contains(p), "{p:?} should be outside");
        }
    }

    #[test]
    fn test_concave_notch_is_outside() {
        // A "U" shape: the notch between the arms is outside.
        let area = ServiceArea::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 9.0),
            GeoPoint::new(9.0, 9.0),
            GeoPoint::new(9.0, 6.0),
            GeoPoint::new(3.0, 6.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(9.0, 3.0),
            GeoPoint::new(9.0, 0.0),
        ])
        .unwrap();

        assert!(area.contains(GeoPoint::new(1.5, 4.5)));
        assert!(area.contains(GeoPoint::new(6.0, 1.5)));
        assert!(!area.contains(GeoPoint::new(6.0, 4.5)));
    }

    #[test]
    fn test_closing_vertex_is_dropped() {
        let area = ServiceArea::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(area.vertices().len(), 3);
    }

    #[test]
    fn test_degenerate_polygon_fails_fast() {
        assert_eq!(
            ServiceArea::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]),
            Err(GeoError::InvalidPolygon(2))
        );
        // Two distinct points plus the closing copy is still degenerate.
        assert_eq!(
            ServiceArea::new(vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(1.0, 1.0),
                GeoPoint::new(0.0, 0.0),
            ]),
            Err(GeoError::InvalidPolygon(2))
        );
        assert_eq!(
            is_serviceable(GeoPoint::new(0.0, 0.0), &[]),
            Err(GeoError::InvalidPolygon(0))
        );
    }

    #[test]
    fn test_free_function_rejects_what_constructor_rejects() {
        let closed_segment = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(0.0, 0.0),
        ];
        assert_eq!(
            is_serviceable(GeoPoint::new(0.5, 0.5), &closed_segment),
            Err(GeoError::InvalidPolygon(2))
        );
        assert!(matches!(
            is_serviceable(
                GeoPoint::new(0.5, 0.5),
                &[
                    GeoPoint::new(0.0, 0.0),
                    GeoPoint::new(0.0, 200.0),
                    GeoPoint::new(1.0, 1.0),
                ],
            ),
            Err(GeoError::InvalidCoordinate { index: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_coordinate() {
        let result = ServiceArea::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(f64::NAN, 1.0),
            GeoPoint::new(1.0, 1.0),
        ]);
        assert!(matches!(
            result,
            Err(GeoError::InvalidCoordinate { index: 1, .. })
        ));
    }

    #[test]
    fn test_free_function_matches_method() {
        let area = square();
        let p = GeoPoint::new(5.0, 5.0);
        assert_eq!(is_serviceable(p, area.vertices()).unwrap(), area.contains(p));
    }

    #[test]
    fn test_bounding_box_and_centroid() {
        let area = square();
        let bbox = area.bounding_box();
        assert!((bbox.south_west.latitude - 0.0).abs() < f64::EPSILON);
        assert!((bbox.north_east.longitude - 10.0).abs() < f64::EPSILON);
        assert!(bbox.contains(GeoPoint::new(5.0, 5.0)));

        let c = area.centroid();
        assert!((c.latitude - 5.0).abs() < 1e-9);
        assert!((c.longitude - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_southern_hemisphere_coordinates() {
        let area = ServiceArea::new(vec![
            GeoPoint::new(-43.817, 172.948),
            GeoPoint::new(-43.790, 172.960),
            GeoPoint::new(-43.790, 172.985),
            GeoPoint::new(-43.812, 172.988),
        ])
        .unwrap();
        assert!(area.contains(GeoPoint::new(-43.803, 172.970)));
        assert!(!area.contains(GeoPoint::new(-43.750, 172.970)));
    }
}

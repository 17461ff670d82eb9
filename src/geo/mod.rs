use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A WGS84 position in decimal degrees.
///
/// Deserialization goes through [`Coordinate::new`], so a decoded value is
/// always finite and inside the valid latitude/longitude ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        let coordinate = Self { lat, lng };
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(ValidationError::InvalidCoordinate { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Moves the point by a local east/north offset in meters.
    pub fn offset_meters(&self, east: f64, north: f64) -> Coordinate {
        let lat = self.lat + north / METERS_PER_DEGREE_LAT;
        let lng_scale = METERS_PER_DEGREE_LAT * self.lat.to_radians().cos().max(1e-9);
        let lng = self.lng + east / lng_scale;
        Coordinate { lat, lng }
    }
}

/// Great-circle distance in meters.
///
/// Both points must be valid coordinates; see [`Coordinate::new`].
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    debug_assert!(a.is_valid() && b.is_valid(), "distance on invalid coordinate");

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_METERS * central_angle
}

/// Area of a ring on the sphere. Open and closed rings give the same result.
pub fn polygon_area_square_meters(vertices: &[Coordinate]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }

    let mut total = 0.0;
    for (i, current) in vertices.iter().enumerate() {
        let next = &vertices[(i + 1) % vertices.len()];
        let delta_lng = (next.lng - current.lng).to_radians();
        total += delta_lng * (2.0 + current.lat.to_radians().sin() + next.lat.to_radians().sin());
    }

    (total * EARTH_RADIUS_METERS * EARTH_RADIUS_METERS / 2.0).abs()
}

/// Ray-casting containment test with longitude as x and latitude as y.
/// A point lying exactly on an edge may land on either side.
pub fn point_in_polygon(point: &Coordinate, vertices: &[Coordinate]) -> bool {
    let mut inside = false;
    if vertices.len() < 3 {
        return inside;
    }

    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].lng, vertices[i].lat);
        let (xj, yj) = (vertices[j].lng, vertices[j].lat);

        let crosses = (yi > point.lat) != (yj > point.lat)
            && point.lng < (xj - xi) * (point.lat - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Regular `segments`-gon inscribed in a circle, counter-clockwise from east.
pub fn circle_vertices(center: &Coordinate, radius_meters: f64, segments: usize) -> Vec<Coordinate> {
    (0..segments)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / segments as f64;
            center.offset_meters(radius_meters * angle.cos(), radius_meters * angle.sin())
        })
        .collect()
}

/// Convex hull of `points` as a closed ring.
///
/// Monotone chain: points are sorted by longitude (then latitude) and the
/// lower and upper chains are built in one pass each. Returns fewer than four
/// vertices when the input is degenerate.
pub fn convex_hull(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut sorted: Vec<Coordinate> = points.iter().copied().filter(Coordinate::is_valid).collect();
    sorted.sort_by(|a, b| {
        a.lng
            .partial_cmp(&b.lng)
            .unwrap_or(Ordering::Equal)
            .then(a.lat.partial_cmp(&b.lat).unwrap_or(Ordering::Equal))
    });
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Coordinate> = Vec::with_capacity(sorted.len());
    for point in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], point) <= 0.0 {
            lower.pop();
        }
        lower.push(*point);
    }

    let mut upper: Vec<Coordinate> = Vec::with_capacity(sorted.len());
    for point in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], point) <= 0.0 {
            upper.pop();
        }
        upper.push(*point);
    }

    // The last point of each chain starts the other one.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    close_ring(lower)
}

fn cross(o: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    (a.lng - o.lng) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lng - o.lng)
}

pub fn is_closed_ring(vertices: &[Coordinate]) -> bool {
    match (vertices.first(), vertices.last()) {
        (Some(first), Some(last)) => vertices.len() > 1 && first == last,
        _ => false,
    }
}

pub fn close_ring(mut vertices: Vec<Coordinate>) -> Vec<Coordinate> {
    if let Some(first) = vertices.first().copied() {
        if !is_closed_ring(&vertices) {
            vertices.push(first);
        }
    }
    vertices
}

pub fn distinct_vertex_count(vertices: &[Coordinate]) -> usize {
    let mut distinct: Vec<&Coordinate> = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        if !distinct.contains(&vertex) {
            distinct.push(vertex);
        }
    }
    distinct.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    fn square(center: Coordinate, half_side_m: f64) -> Vec<Coordinate> {
        close_ring(vec![
            center.offset_meters(-half_side_m, -half_side_m),
            center.offset_meters(half_side_m, -half_side_m),
            center.offset_meters(half_side_m, half_side_m),
            center.offset_meters(-half_side_m, half_side_m),
        ])
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = coord(41.0082, 28.9784);
        assert!(distance_meters(&p, &p) < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = coord(51.5074, -0.1278);
        let paris = coord(48.8566, 2.3522);
        let distance = distance_meters(&london, &paris);
        assert!((distance - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let a = coord(0.0, 0.0);
        let b = coord(0.0, 180.0);
        let distance = distance_meters(&a, &b);
        assert!(distance.is_finite());
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_non_finite() {
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(41.0, 29.0).is_ok());
    }

    #[test]
    fn deserializing_invalid_coordinate_fails() {
        let result: Result<Coordinate, _> = serde_json::from_str(r#"{"lat": 120.0, "lng": 10.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn area_is_zero_below_three_vertices() {
        assert_eq!(polygon_area_square_meters(&[]), 0.0);
        assert_eq!(polygon_area_square_meters(&[coord(1.0, 1.0), coord(1.0, 2.0)]), 0.0);
    }

    #[test]
    fn one_km_square_is_about_one_square_km() {
        let ring = square(coord(41.0, 29.0), 500.0);
        let area = polygon_area_square_meters(&ring);
        assert!((area - 1_000_000.0).abs() < 20_000.0, "area was {area}");
    }

    #[test]
    fn area_ignores_ring_closure() {
        let ring = square(coord(39.0, 32.0), 250.0);
        let open = &ring[..ring.len() - 1];
        let closed = polygon_area_square_meters(&ring);
        assert!((closed - polygon_area_square_meters(open)).abs() < 1e-6);
    }

    #[test]
    fn point_in_polygon_inside_and_outside() {
        let center = coord(41.0, 29.0);
        let ring = square(center, 500.0);
        assert!(point_in_polygon(&center, &ring));
        assert!(!point_in_polygon(&center.offset_meters(2_000.0, 0.0), &ring));
    }

    #[test]
    fn point_in_polygon_needs_three_vertices() {
        let line = vec![coord(0.0, 0.0), coord(1.0, 1.0)];
        assert!(!point_in_polygon(&coord(0.5, 0.5), &line));
    }

    #[test]
    fn circle_vertices_lie_on_radius() {
        let center = coord(41.0, 29.0);
        for vertex in circle_vertices(&center, 300.0, 8) {
            let d = distance_meters(&center, &vertex);
            assert!((d - 300.0).abs() < 3.0, "vertex at {d} m");
        }
    }

    #[test]
    fn hull_drops_interior_points_and_closes() {
        let points = vec![
            coord(0.0, 0.0),
            coord(0.0, 1.0),
            coord(1.0, 1.0),
            coord(1.0, 0.0),
            coord(0.5, 0.5),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 5);
        assert!(is_closed_ring(&hull));
        assert!(!hull.contains(&coord(0.5, 0.5)));
    }

    #[test]
    fn distinct_count_ignores_closure_duplicate() {
        let ring = square(coord(10.0, 10.0), 100.0);
        assert_eq!(ring.len(), 5);
        assert_eq!(distinct_vertex_count(&ring), 4);
    }
}

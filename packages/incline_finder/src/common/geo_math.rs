//! Pure geodesic helpers used when building the road graph and when working
//! out the area which needs to be fetched for a route. All distances are in
//! miles, all angles are in degrees unless stated otherwise.

use geo::{Destination, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Radius of the Earth in miles, used for all haversine calculations
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Conversion factor used when turning edge distances into a run in metres
pub const METRES_PER_MILE: f64 = 1609.34;

/// Below this angular distance (radians) two points are treated as identical
/// when interpolating
const MIN_ANGULAR_DISTANCE: f64 = 1e-12;

/// A single point on the surface of the Earth. This is serialized using the
/// `lat`/`lng` keys expected by the frontend, `lon` is also accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(rename = "lng", alias = "lon")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }
}

impl From<Coordinate> for Point {
    fn from(coord: Coordinate) -> Point {
        Point::new(coord.lon, coord.lat)
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Coordinate {
        Coordinate {
            lat: point.y(),
            lon: point.x(),
        }
    }
}

/// Central angle between two points in radians
fn angular_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.lon - p1.lon).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two points in miles
pub fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    EARTH_RADIUS_MILES * angular_distance(p1, p2)
}

/// Project a point the provided distance along the provided bearing, where
/// a bearing of 0 is due north and 90 is due east
pub fn destination_point(
    origin: &Coordinate,
    bearing: f64,
    distance: f64,
) -> Coordinate {
    let centre = Point::from(*origin);
    let dest =
        Haversine::destination(centre, bearing, distance * METRES_PER_MILE);
    dest.into()
}

/// Find the point which sits the provided fraction of the way along the
/// great circle arc between p1 and p2. A fraction of 0 returns p1, a fraction
/// of 1 returns p2. If both points are the same, p1 is returned as-is.
pub fn interpolate(
    p1: &Coordinate,
    p2: &Coordinate,
    fraction: f64,
) -> Coordinate {
    let delta = angular_distance(p1, p2);
    if delta < MIN_ANGULAR_DISTANCE {
        return *p1;
    }

    let (lat1, lon1) = (p1.lat.to_radians(), p1.lon.to_radians());
    let (lat2, lon2) = (p2.lat.to_radians(), p2.lon.to_radians());

    let a = ((1.0 - fraction) * delta).sin() / delta.sin();
    let b = (fraction * delta).sin() / delta.sin();

    let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
    let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
    let z = a * lat1.sin() + b * lat2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);

    Coordinate::new(lat.to_degrees(), lon.to_degrees())
}

#[cfg(test)]
mod tests {

    use approx::assert_abs_diff_eq;

    use super::*;

    /// One degree of longitude along the equator is a fixed fraction of the
    /// Earth's circumference
    #[test]
    fn test_haversine_distance_equator() {
        let p1 = Coordinate::new(0.0, 0.0);
        let p2 = Coordinate::new(0.0, 1.0);

        let target = EARTH_RADIUS_MILES * 1.0_f64.to_radians();

        let result = haversine_distance(&p1, &p2);

        assert_abs_diff_eq!(result, target, epsilon = 1e-9);
    }

    /// Distance should not depend on direction of travel
    #[test]
    fn test_haversine_distance_symmetric() {
        let p1 = Coordinate::new(36.512916, -82.531524);
        let p2 = Coordinate::new(36.520001, -82.540012);

        let there = haversine_distance(&p1, &p2);
        let back = haversine_distance(&p2, &p1);

        assert_abs_diff_eq!(there, back, epsilon = 1e-12);
        assert!(there > 0.0);
    }

    #[test]
    fn test_haversine_distance_zero() {
        let p1 = Coordinate::new(51.0012009, -1.3387398);

        assert_eq!(haversine_distance(&p1, &p1), 0.0);
    }

    /// Projecting due north should only change the latitude, and the
    /// resulting point should sit at the requested distance
    #[test]
    fn test_destination_point_north() {
        let origin = Coordinate::new(10.0, 20.0);

        let result = destination_point(&origin, 0.0, 5.0);

        assert!(result.lat > origin.lat);
        assert_abs_diff_eq!(result.lon, origin.lon, epsilon = 1e-9);
        assert_abs_diff_eq!(
            haversine_distance(&origin, &result),
            5.0,
            epsilon = 1e-3
        );
    }

    /// Projecting due east should increase the longitude
    #[test]
    fn test_destination_point_east() {
        let origin = Coordinate::new(0.0, 0.0);

        let result = destination_point(&origin, 90.0, 2.0);

        assert!(result.lon > 0.0);
        assert_abs_diff_eq!(result.lat, 0.0, epsilon = 1e-9);
    }

    mod test_interpolate {

        use super::*;

        /// The mid point of an arc along the equator should sit on the
        /// equator, half way between the two longitudes
        #[test]
        fn test_midpoint() {
            let p1 = Coordinate::new(0.0, 0.0);
            let p2 = Coordinate::new(0.0, 0.02);

            let result = interpolate(&p1, &p2, 0.5);

            assert_abs_diff_eq!(result.lat, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(result.lon, 0.01, epsilon = 1e-12);
        }

        /// Fractions of 0 and 1 should return the end points
        #[test]
        fn test_end_points() {
            let p1 = Coordinate::new(36.51, -82.53);
            let p2 = Coordinate::new(36.52, -82.55);

            let start = interpolate(&p1, &p2, 0.0);
            let end = interpolate(&p1, &p2, 1.0);

            assert_abs_diff_eq!(start.lat, p1.lat, epsilon = 1e-9);
            assert_abs_diff_eq!(start.lon, p1.lon, epsilon = 1e-9);
            assert_abs_diff_eq!(end.lat, p2.lat, epsilon = 1e-9);
            assert_abs_diff_eq!(end.lon, p2.lon, epsilon = 1e-9);
        }

        /// Interpolating between two identical points must not produce NaN
        #[test]
        fn test_zero_distance() {
            let p1 = Coordinate::new(36.51, -82.53);

            let result = interpolate(&p1, &p1, 0.25);

            assert_eq!(result, p1);
        }

        /// The interpolated point should split the arc in the requested
        /// proportion
        #[test]
        fn test_distance_proportion() {
            let p1 = Coordinate::new(36.51, -82.53);
            let p2 = Coordinate::new(36.52, -82.55);
            let total = haversine_distance(&p1, &p2);

            let result = interpolate(&p1, &p2, 0.25);

            assert_abs_diff_eq!(
                haversine_distance(&p1, &result),
                total * 0.25,
                epsilon = 1e-9
            );
        }
    }

    /// Coordinates should use the lat/lng keys expected by the frontend
    #[test]
    fn test_coordinate_serde() {
        let coord = Coordinate::new(1.5, -2.5);

        let json = serde_json::to_value(coord).unwrap();
        assert_eq!(json, serde_json::json!({"lat": 1.5, "lng": -2.5}));

        let parsed: Coordinate =
            serde_json::from_str(r#"{"lat": 1.5, "lon": -2.5}"#).unwrap();
        assert_eq!(parsed, coord);
    }
}

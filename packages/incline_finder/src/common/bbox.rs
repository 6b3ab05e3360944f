//! Defines a struct to represent a bounding box, which is used to represent
//! a 2d square(ish) on the planet's surface. This sets the area which is
//! requested from the road data provider for each route search

use serde::Serialize;

use crate::common::geo_math::{Coordinate, destination_point};

/// A bounding box for geographical data. Contains the minimum and maximum
/// latitudes & longitudes, defining a 'rectangle' on the surface of the Earth
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BBox {
    /// Generate a bounding box which covers everything within the provided
    /// radius of the origin. The box is built from the points due north,
    /// east, south and west of the origin, so it is an approximation rather
    /// than the smallest box containing the full circle.
    pub fn around(origin: &Coordinate, radius: f64) -> Self {
        let north = destination_point(origin, 0.0, radius);
        let east = destination_point(origin, 90.0, radius);
        let south = destination_point(origin, 180.0, radius);
        let west = destination_point(origin, 270.0, radius);

        BBox {
            min_lat: south.lat,
            min_lon: west.lon,
            max_lat: north.lat,
            max_lon: east.lon,
        }
    }

    /// Render the box in the south,west,north,east order used by Overpass
    pub fn to_overpass_str(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

//! Raw inputs to the graph building process, as received from the road and
//! elevation data providers

use crate::common::geo_math::Coordinate;

/// Number of decimal places used when matching elevation samples to nodes
const KEY_PRECISION: f64 = 1e6;

/// A single way (road, path, track etc) from the road data provider. Each
/// entry in node_ids should have a matching entry in coords, if any of the
/// coordinates are missing then that entry will be None
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub node_ids: Vec<i64>,
    pub coords: Vec<Option<Coordinate>>,
}

impl Way {
    /// Check that every node in the way has a corresponding coordinate slot
    pub fn is_consistent(&self) -> bool {
        self.node_ids.len() == self.coords.len()
    }
}

/// The elevation of a single point, in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationSample {
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
}

impl ElevationSample {
    pub fn key(&self) -> CoordKey {
        CoordKey::new(self.lat, self.lon)
    }
}

/// Coordinates rounded to 6 decimal places (~0.11m), stored as scaled
/// integers so that they can be used as hash keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey(i64, i64);

impl CoordKey {
    pub fn new(lat: f64, lon: f64) -> Self {
        CoordKey(
            (lat * KEY_PRECISION).round() as i64,
            (lon * KEY_PRECISION).round() as i64,
        )
    }
}

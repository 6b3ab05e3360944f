//! Finds routes of a requested length which stay close to a target incline,
//! using road network data from Overpass and elevations from an
//! Open-Elevation compatible service.

pub mod common;
pub mod loading;
pub mod pipeline;
pub mod routing;

#[cfg(test)]
mod test_utils;

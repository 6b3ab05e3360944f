//! This module focuses on retrieving road & elevation data from external
//! providers and using it to generate a petgraph graph object.

pub mod elevation;
pub mod overpass;
pub mod petgraph;
pub mod structs;

use petgraph::{Graph, Undirected};

use crate::common::geo_math::Coordinate;

/// The graph which is used for route finding. Roads can be travelled in
/// either direction, so edges are undirected
pub type RoadGraph = Graph<NodeData, EdgeData, Undirected, u32>;

/// Sets the data which will be stored as weights in the petgraph graph.
/// Elevation is only populated once the graph has been enriched
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct NodeData {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

impl NodeData {
    pub fn coord(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Edge weight, the great-circle distance between both ends in miles
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct EdgeData {
    pub distance: f64,
}

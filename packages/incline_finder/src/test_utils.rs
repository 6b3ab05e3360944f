//! Helpers for building small road graphs in tests

use petgraph::graph::NodeIndex;

use crate::common::config::{SearchParameters, SearchSettings};
use crate::common::geo_math::{
    Coordinate, EARTH_RADIUS_MILES, METRES_PER_MILE, haversine_distance,
};
use crate::common::graph_data::{EdgeData, NodeData, RoadGraph};

/// Convert a distance along the equator into degrees of longitude
pub fn miles_to_degrees(miles: f64) -> f64 {
    (miles / EARTH_RADIUS_MILES).to_degrees()
}

/// The change in elevation (in metres) which produces the requested incline
/// over the provided distance (in miles)
pub fn rise_for(incline: f64, distance: f64) -> f64 {
    incline / 100.0 * distance * METRES_PER_MILE
}

pub fn add_test_node(
    graph: &mut RoadGraph,
    id: i64,
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
) -> NodeIndex {
    graph.add_node(NodeData {
        id: id,
        lat: lat,
        lon: lon,
        elevation: elevation,
    })
}

/// Join two nodes, using the distance between them as the edge weight
pub fn join_test_nodes(graph: &mut RoadGraph, src: NodeIndex, dst: NodeIndex) {
    let distance = haversine_distance(
        &Coordinate::new(graph[src].lat, graph[src].lon),
        &Coordinate::new(graph[dst].lat, graph[dst].lon),
    );
    graph.add_edge(src, dst, EdgeData { distance: distance });
}

/// Generate a straight road running east along the equator, with one node
/// for each of the provided elevations
pub fn line_graph(
    elevations: &[f64],
    spacing: f64,
) -> (RoadGraph, Vec<NodeIndex>) {
    let mut graph = RoadGraph::default();
    let step = miles_to_degrees(spacing);

    let nodes: Vec<NodeIndex> = elevations
        .iter()
        .enumerate()
        .map(|(inx, ele)| {
            add_test_node(
                &mut graph,
                inx as i64,
                0.0,
                step * inx as f64,
                Some(*ele),
            )
        })
        .collect();

    for pair in nodes.windows(2) {
        join_test_nodes(&mut graph, pair[0], pair[1]);
    }

    (graph, nodes)
}

/// Generate a square grid of roads near the equator, with the elevation of
/// each node set by its row and column
pub fn grid_graph(
    size: usize,
    spacing: f64,
    elevation: impl Fn(usize, usize) -> f64,
) -> RoadGraph {
    let mut graph = RoadGraph::default();
    let step = miles_to_degrees(spacing);

    let mut nodes = Vec::with_capacity(size * size);
    for row in 0..size {
        for col in 0..size {
            nodes.push(add_test_node(
                &mut graph,
                (row * size + col) as i64,
                step * row as f64,
                step * col as f64,
                Some(elevation(row, col)),
            ));
        }
    }

    for row in 0..size {
        for col in 0..size {
            let inx = nodes[row * size + col];
            if col + 1 < size {
                join_test_nodes(&mut graph, inx, nodes[row * size + col + 1]);
            }
            if row + 1 < size {
                join_test_nodes(&mut graph, inx, nodes[(row + 1) * size + col]);
            }
        }
    }

    graph
}

/// Search parameters with default settings, targeting the provided distance
pub fn get_test_parameters(path_distance: f64) -> SearchParameters {
    let settings = SearchSettings::default();
    SearchParameters {
        origin: Coordinate::new(0.0, 0.0),
        search_radius: 1.0,
        path_distance: path_distance,
        optimal_incline: 2.0,
        overall_tolerance: 0.10,
        local_tolerance: 0.01,
        max_routes: settings.max_routes,
        start_sample_size: settings.start_sample_size,
        exploration_mode: settings.exploration_mode,
        overall_rule: settings.overall_rule,
        local_band: settings.local_band,
        max_steps_per_start: settings.max_steps_per_start,
        parallel: false,
        show_progress: false,
    }
}

//! Functions which turn the raw way data from the road data provider into a
//! petgraph graph, and then attach elevation data to it.

use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::common::error::PipelineError;
use crate::common::geo_math::{Coordinate, haversine_distance, interpolate};
use crate::common::graph_data::{EdgeData, NodeData, RoadGraph};
use crate::loading::structs::{CoordKey, ElevationSample, Way};

/// Keeps track of the state required while ways are being added to the
/// graph. Nodes are tracked using the identifiers from the source data, so
/// that ways which share a node are joined together in the graph.
struct GraphBuilder {
    graph: RoadGraph,
    node_id_inx_map: FxHashMap<i64, NodeIndex>,
    next_synthetic_id: i64,
    threshold: f64,
}

impl GraphBuilder {
    /// Set up a new builder. Nodes created by subdividing long segments are
    /// given negative IDs, starting below the smallest ID in the source data
    /// so that they can never collide with it
    fn new(ways: &[Way], threshold: f64) -> GraphBuilder {
        let min_source_id = ways
            .iter()
            .flat_map(|way| way.node_ids.iter())
            .copied()
            .min()
            .unwrap_or(0);

        GraphBuilder {
            graph: RoadGraph::default(),
            node_id_inx_map: FxHashMap::default(),
            next_synthetic_id: min_source_id.min(0) - 1,
            threshold: threshold,
        }
    }

    /// Fetch the coordinates for a node. Once a node has been added to the
    /// graph its coordinates are never updated, so those take priority over
    /// the coordinates provided by later ways
    fn resolve_coord(&self, id: i64, fallback: Coordinate) -> Coordinate {
        match self.node_id_inx_map.get(&id) {
            Some(inx) => self.graph[*inx].coord(),
            None => fallback,
        }
    }

    fn get_or_add_node(&mut self, id: i64, coord: Coordinate) -> NodeIndex {
        if let Some(inx) = self.node_id_inx_map.get(&id) {
            return *inx;
        }

        let inx = self.graph.add_node(NodeData {
            id: id,
            lat: coord.lat,
            lon: coord.lon,
            elevation: None,
        });
        self.node_id_inx_map.insert(id, inx);
        inx
    }

    fn add_synthetic_node(&mut self, coord: Coordinate) -> NodeIndex {
        let id = self.next_synthetic_id;
        self.next_synthetic_id -= 1;
        self.get_or_add_node(id, coord)
    }

    /// Join two nodes, weighting the edge by the distance between their
    /// stored coordinates. Adding the same pair twice updates the existing
    /// edge with an identical weight
    fn join(&mut self, src: NodeIndex, dst: NodeIndex) {
        let src_coord = self.graph[src].coord();
        let dst_coord = self.graph[dst].coord();
        let distance = haversine_distance(&src_coord, &dst_coord);
        if distance > 0.0 {
            self.graph.update_edge(src, dst, EdgeData { distance });
        }
    }

    /// Add a single segment of a way to the graph. Segments longer than the
    /// threshold are split into evenly spaced sub-segments
    fn add_segment(
        &mut self,
        (src_id, src_coord): (i64, Coordinate),
        (dst_id, dst_coord): (i64, Coordinate),
    ) {
        let src_coord = self.resolve_coord(src_id, src_coord);
        let dst_coord = self.resolve_coord(dst_id, dst_coord);

        let distance = haversine_distance(&src_coord, &dst_coord);
        if distance <= 0.0 {
            debug!("Skipping zero length segment {src_id} -> {dst_id}");
            return;
        }

        let src_inx = self.get_or_add_node(src_id, src_coord);

        let num_subdivisions = if distance > self.threshold {
            (distance / self.threshold).floor() as usize
        } else {
            0
        };

        let mut last_inx = src_inx;
        for step in 1..=num_subdivisions {
            let fraction = step as f64 / (num_subdivisions + 1) as f64;
            let point = interpolate(&src_coord, &dst_coord, fraction);
            let new_inx = self.add_synthetic_node(point);
            self.join(last_inx, new_inx);
            last_inx = new_inx;
        }

        let dst_inx = self.get_or_add_node(dst_id, dst_coord);
        self.join(last_inx, dst_inx);
    }

    /// Add every segment of a way to the graph. Returns false if the way
    /// could not be used at all
    fn add_way(&mut self, way: &Way) -> bool {
        if !way.is_consistent() {
            warn!(
                "Skipping way {} due to mismatched nodes and geometry",
                way.id
            );
            return false;
        }

        for inx in 1..way.node_ids.len() {
            let src = (way.node_ids[inx - 1], way.coords[inx - 1]);
            let dst = (way.node_ids[inx], way.coords[inx]);

            // A missing coordinate leaves a gap in the way, but the rest of
            // it can still be used
            match (src, dst) {
                ((src_id, Some(src_coord)), (dst_id, Some(dst_coord))) => {
                    self.add_segment((src_id, src_coord), (dst_id, dst_coord))
                }
                _ => continue,
            }
        }

        true
    }
}

/// Based on the way data which has been loaded from the road data provider,
/// generate a petgraph graph which can be used for route finding. Any
/// segments longer than the provided threshold (in miles) are subdivided, so
/// that no edge in the graph is longer than it. The threshold must be a
/// positive, finite distance
pub fn build_graph(
    ways: &[Way],
    threshold: f64,
) -> Result<RoadGraph, PipelineError> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(PipelineError::Configuration(format!(
            "subdivision threshold must be a positive distance, got {}",
            threshold
        )));
    }

    let mut builder = GraphBuilder::new(ways, threshold);

    let mut skipped = 0;
    for way in ways {
        if !builder.add_way(way) {
            skipped += 1;
        }
    }

    let graph = builder.graph;
    info!(
        "Built graph with {} nodes and {} edges from {} ways ({} skipped)",
        graph.node_count(),
        graph.edge_count(),
        ways.len(),
        skipped
    );

    Ok(graph)
}

/// Retrieve the coordinates of every node in the graph, these are used to
/// request elevation data
pub fn get_node_coords(graph: &RoadGraph) -> Vec<Coordinate> {
    graph.node_weights().map(|node| node.coord()).collect()
}

/// Attach elevation data to every node in the graph. Samples are matched to
/// nodes based on their coordinates, rounded to 6 decimal places. Any node
/// which can't be matched is dropped from the graph along with all of its
/// edges. As node indices are not static, a new graph is returned.
pub fn enrich_graph(
    graph: RoadGraph,
    samples: &[ElevationSample],
) -> Result<RoadGraph, PipelineError> {
    let lookup: FxHashMap<CoordKey, f64> = samples
        .iter()
        .map(|sample| (sample.key(), sample.elevation))
        .collect();

    let before = graph.node_count();

    let enriched = graph.filter_map(
        |_, node| {
            let key = CoordKey::new(node.lat, node.lon);
            match lookup.get(&key) {
                Some(elevation) => Some(NodeData {
                    elevation: Some(*elevation),
                    ..*node
                }),
                None => {
                    debug!("Node {} missing elevation data", node.id);
                    None
                }
            }
        },
        |_, edge| Some(*edge),
    );

    let dropped = before - enriched.node_count();
    if dropped > 0 {
        warn!("Dropped {dropped} nodes with no elevation data");
    }

    if enriched.node_count() == 0 {
        return Err(PipelineError::EmptyGraph);
    }

    info!(
        "Enriched graph, final node count: {}",
        enriched.node_count()
    );

    Ok(enriched)
}

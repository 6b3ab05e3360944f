//! Orchestration of a single route search, from fetching the road network
//! around the requested origin through to the finished list of routes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use crate::common::bbox::BBox;
use crate::common::config::{SearchParameters, SearchSettings};
use crate::common::error::PipelineError;
use crate::common::geo_math::{Coordinate, haversine_distance};
use crate::common::graph_data::RoadGraph;
use crate::loading::elevation::ElevationSource;
use crate::loading::overpass::RoadDataSource;
use crate::loading::petgraph::{build_graph, enrich_graph, get_node_coords};
use crate::routing::common::Route;
use crate::routing::search::generate_routes;

/// Fetch the road network and elevation data for the area around the
/// requested origin, and combine them into a graph which is ready to be
/// searched. Every node in the returned graph has an elevation
pub async fn prepare_graph<R, E>(
    params: &SearchParameters,
    settings: &SearchSettings,
    roads: &R,
    elevation: &E,
) -> Result<RoadGraph, PipelineError>
where
    R: RoadDataSource,
    E: ElevationSource,
{
    let bbox = BBox::around(&params.origin, params.fetch_radius());
    info!("Fetching road network for {}", bbox.to_overpass_str());

    let ways = roads.fetch_ways(&bbox).await?;
    if ways.is_empty() {
        return Err(PipelineError::UpstreamDataUnavailable(
            "no ways found in the requested area".to_string(),
        ));
    }

    let graph = build_graph(&ways, settings.subdivision_threshold)?;
    if graph.node_count() == 0 {
        warn!("None of the {} ways could be added to the graph", ways.len());
        return Err(PipelineError::EmptyGraph);
    }

    let coords = get_node_coords(&graph);
    let samples = elevation.fetch_elevations(&coords).await?;
    if samples.is_empty() {
        return Err(PipelineError::UpstreamDataUnavailable(
            "no elevation data returned".to_string(),
        ));
    }

    enrich_graph(graph, &samples)
}

/// Run a complete route search for the provided parameters. The search
/// itself is CPU bound, so it is moved onto a blocking worker along with the
/// random source used to pick start nodes and order neighbours
pub async fn find_routes<R, E, G>(
    params: SearchParameters,
    settings: &SearchSettings,
    roads: &R,
    elevation: &E,
    mut rng: G,
) -> Result<Vec<Route>, PipelineError>
where
    R: RoadDataSource,
    E: ElevationSource,
    G: Rng + Send + 'static,
{
    let graph = prepare_graph(&params, settings, roads, elevation).await?;

    let routes =
        spawn_blocking(move || generate_routes(&graph, &params, &mut rng))
            .await
            .map_err(|err| PipelineError::Internal(err.to_string()))?;

    info!("Returning {} routes", routes.len());
    Ok(routes)
}

/// Request for the elevation along a path which has already been drawn, such
/// as one of the routes returned by a previous search
#[derive(Debug, Clone, Deserialize)]
pub struct ElevationProfileRequest {
    pub path: Option<Vec<Coordinate>>,
}

/// A single point on an elevation profile. Distance is cumulative along the
/// profile, in miles
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfilePoint {
    pub lat: f64,
    #[serde(rename = "lng")]
    pub lon: f64,
    pub elevation: f64,
    pub distance: f64,
}

/// Look up the elevation of every point on the requested path. Points which
/// the elevation source has no data for are left out of the profile
pub async fn elevation_profile<E>(
    request: ElevationProfileRequest,
    elevation: &E,
) -> Result<Vec<ProfilePoint>, PipelineError>
where
    E: ElevationSource,
{
    let path = match request.path {
        Some(path) if !path.is_empty() => path,
        Some(_) => {
            return Err(PipelineError::InvalidRequest(
                "'path' must contain at least one point".to_string(),
            ));
        }
        None => {
            return Err(PipelineError::InvalidRequest(
                "missing 'path' in request body".to_string(),
            ));
        }
    };

    info!("Fetching elevation profile for {} points", path.len());
    let samples = elevation.fetch_elevations(&path).await?;
    if samples.is_empty() {
        return Err(PipelineError::UpstreamDataUnavailable(
            "no elevation data returned".to_string(),
        ));
    }

    let mut profile: Vec<ProfilePoint> = Vec::with_capacity(samples.len());
    for sample in samples {
        let coord = Coordinate::new(sample.lat, sample.lon);
        let distance = match profile.last() {
            Some(prev) => {
                prev.distance
                    + haversine_distance(
                        &Coordinate::new(prev.lat, prev.lon),
                        &coord,
                    )
            }
            None => 0.0,
        };
        profile.push(ProfilePoint {
            lat: sample.lat,
            lon: sample.lon,
            elevation: sample.elevation,
            distance: distance,
        });
    }

    Ok(profile)
}

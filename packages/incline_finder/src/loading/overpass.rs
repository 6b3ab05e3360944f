//! The functions defined here can be used to read in details of all of the
//! ways (roads, paths, tracks) within the area the user has selected for
//! route creation, using an Overpass API instance.

use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::common::bbox::BBox;
use crate::common::config::ProviderSettings;
use crate::common::error::ProviderError;
use crate::common::geo_math::Coordinate;
use crate::loading::structs::Way;

/// Anything which can supply the ways contained in a bounding box
pub trait RoadDataSource {
    fn fetch_ways(
        &self,
        bbox: &BBox,
    ) -> impl Future<Output = Result<Vec<Way>, ProviderError>> + Send;
}

/// A single point in the geometry of a way, points which cannot be
/// resolved by Overpass are sent as null
#[derive(Deserialize, Debug)]
struct OverpassPoint {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    nodes: Vec<i64>,
    #[serde(default)]
    geometry: Vec<Option<OverpassPoint>>,
}

/// Container for the raw output of an Overpass query
#[derive(Deserialize, Debug)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

impl From<OverpassElement> for Way {
    fn from(element: OverpassElement) -> Way {
        let coords = element
            .geometry
            .into_iter()
            .map(|point| match point {
                Some(OverpassPoint {
                    lat: Some(lat),
                    lon: Some(lon),
                }) => Some(Coordinate::new(lat, lon)),
                _ => None,
            })
            .collect();

        Way {
            id: element.id,
            node_ids: element.nodes,
            coords: coords,
        }
    }
}

impl OverpassResponse {
    /// Keep only the ways in the response, any other element types are
    /// dropped
    fn into_ways(self) -> Vec<Way> {
        self.elements
            .into_iter()
            .filter(|element| element.kind == "way")
            .map(Way::from)
            .collect()
    }
}

/// Client for an Overpass API instance
#[derive(Clone, Debug)]
pub struct OverpassClient {
    client: Client,
    url: String,
    highways: Vec<String>,
}

impl OverpassClient {
    pub fn new(client: Client, settings: &ProviderSettings) -> OverpassClient {
        OverpassClient {
            client: client,
            url: settings.overpass_url.clone(),
            highways: settings.highways.clone(),
        }
    }

    /// Generate an Overpass QL query which fetches the full geometry of all
    /// ways with one of the configured highway types
    pub fn build_query(&self, bbox: &BBox) -> String {
        let highways = self.highways.join("|");
        let bbox_str = bbox.to_overpass_str();
        format!(
            "[out:json];(way[\"highway\"~\"^({highways})$\"]({bbox_str}););out geom;"
        )
    }
}

impl RoadDataSource for OverpassClient {
    async fn fetch_ways(&self, bbox: &BBox) -> Result<Vec<Way>, ProviderError> {
        let query = self.build_query(bbox);

        info!("Querying Overpass API for road network");
        let response = self
            .client
            .post(&self.url)
            .body(query)
            .send()
            .await?
            .error_for_status()?;

        let body: OverpassResponse = response.json().await?;
        let ways = body.into_ways();

        info!("Fetched {} ways from Overpass", ways.len());
        Ok(ways)
    }
}

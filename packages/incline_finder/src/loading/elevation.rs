//! Retrieval of elevation data for the nodes in the road graph, using an
//! Open-Elevation compatible API. Requests are split into batches with a
//! pause between each one, to stay within the limits of public instances.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::common::config::ProviderSettings;
use crate::common::error::ProviderError;
use crate::common::geo_math::Coordinate;
use crate::loading::structs::ElevationSample;

/// Anything which can supply elevations for a list of coordinates. It is
/// acceptable to return samples for only some of the coordinates
pub trait ElevationSource {
    fn fetch_elevations(
        &self,
        coords: &[Coordinate],
    ) -> impl Future<Output = Result<Vec<ElevationSample>, ProviderError>> + Send;
}

#[derive(Serialize, Debug)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Debug)]
struct ElevationRequest {
    locations: Vec<Location>,
}

#[derive(Deserialize, Debug)]
struct ElevationResult {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
}

/// Container for the raw output of an elevation lookup
#[derive(Deserialize, Debug)]
struct ElevationResponse {
    #[serde(default)]
    results: Vec<ElevationResult>,
}

impl ElevationResponse {
    /// Unpack the response, dropping any points without an elevation
    fn into_samples(self) -> Vec<ElevationSample> {
        self.results
            .into_iter()
            .filter_map(|result| {
                result.elevation.map(|elevation| ElevationSample {
                    lat: result.latitude,
                    lon: result.longitude,
                    elevation: elevation,
                })
            })
            .collect()
    }
}

/// Client for an Open-Elevation compatible lookup endpoint
#[derive(Clone, Debug)]
pub struct OpenElevationClient {
    client: Client,
    url: String,
    batch_size: usize,
    pacing: Duration,
}

impl OpenElevationClient {
    pub fn new(
        client: Client,
        settings: &ProviderSettings,
    ) -> OpenElevationClient {
        OpenElevationClient {
            client: client,
            url: settings.elevation_url.clone(),
            batch_size: settings.elevation_batch_size.max(1),
            pacing: Duration::from_millis(settings.elevation_pacing_ms),
        }
    }

    async fn fetch_batch(
        &self,
        batch: &[Coordinate],
    ) -> Result<Vec<ElevationSample>, ProviderError> {
        let payload = ElevationRequest {
            locations: batch
                .iter()
                .map(|coord| Location {
                    latitude: coord.lat,
                    longitude: coord.lon,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: ElevationResponse = response.json().await?;
        Ok(body.into_samples())
    }
}

impl ElevationSource for OpenElevationClient {
    async fn fetch_elevations(
        &self,
        coords: &[Coordinate],
    ) -> Result<Vec<ElevationSample>, ProviderError> {
        if coords.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "no coordinates provided for elevation lookup".to_string(),
            ));
        }

        info!("Fetching elevation for {} coordinates", coords.len());

        let mut samples = Vec::with_capacity(coords.len());
        for (inx, batch) in coords.chunks(self.batch_size).enumerate() {
            if inx > 0 {
                sleep(self.pacing).await;
            }
            let batch_samples = self.fetch_batch(batch).await?;
            debug!(
                "Elevation batch {} returned {} of {} points",
                inx,
                batch_samples.len(),
                batch.len()
            );
            samples.extend(batch_samples);
        }

        info!("Received elevation for {} coordinates", samples.len());
        Ok(samples)
    }
}

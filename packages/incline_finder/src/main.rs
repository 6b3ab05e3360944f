use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::serve;
use axum::{Json, Router};
use incline_finder::common::config::{
    SearchParameters, Settings, UserSearchRequest,
};
use incline_finder::common::error::PipelineError;
use incline_finder::loading::elevation::OpenElevationClient;
use incline_finder::loading::overpass::OverpassClient;
use incline_finder::pipeline::{
    ElevationProfileRequest, elevation_profile, find_routes,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    roads: OverpassClient,
    elevation: OpenElevationClient,
}

/// Wrapper which converts pipeline failures into HTTP responses
struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> ApiError {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::UpstreamDataUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            PipelineError::EmptyGraph => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Configuration(_) | PipelineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = json!({
            "status": "error",
            "message": self.0.to_string()
        });
        (status, Json(body)).into_response()
    }
}

/// Unpack a JSON request body, bodies which can't be read are reported
/// with the same error format as every other rejected request
fn read_body<T: DeserializeOwned>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(ApiError(PipelineError::InvalidRequest(
            rejection.body_text(),
        ))),
    }
}

async fn get_routes(
    State(state): State<AppState>,
    payload: Result<Json<UserSearchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Instant::now();
    let request = read_body(payload)?;

    let params =
        SearchParameters::from_request(request, &state.settings.search)?;

    let routes = find_routes(
        params,
        &state.settings.search,
        &state.roads,
        &state.elevation,
        StdRng::from_entropy(),
    )
    .await?;

    info!(
        "{} routes generated in {:.2?}",
        routes.len(),
        now.elapsed()
    );

    Ok((StatusCode::OK, Json(routes)))
}

async fn get_elevation(
    State(state): State<AppState>,
    payload: Result<Json<ElevationProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = read_body(payload)?;

    let profile = elevation_profile(request, &state.elevation).await?;

    let json_response = json!({
        "status": "success",
        "elevationProfile": profile
    });

    Ok((StatusCode::OK, Json(json_response)))
}

async fn health_check() -> impl IntoResponse {
    let msg = "Hello World!";

    let json_response = json!({
        "status": "success",
        "message": msg
    });

    Json(json_response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let client = Client::new();
    let state = AppState {
        roads: OverpassClient::new(client.clone(), &settings.providers),
        elevation: OpenElevationClient::new(client, &settings.providers),
        settings: Arc::new(settings),
    };

    let router = Router::new()
        .route("/healthcheck", get(health_check))
        .route("/api/routes", post(get_routes))
        .route("/api/elevation", post(get_elevation))
        .with_state(state.clone());

    let listener =
        tokio::net::TcpListener::bind(&state.settings.bind_addr).await?;
    info!("Listening on {}", state.settings.bind_addr);

    serve(listener, router).await?;
    Ok(())
}

//! Errors which can abort the route finding pipeline. Problems with a single
//! candidate route (e.g. a node without elevation data) are not errors, they
//! simply cause that candidate to be discarded.

use thiserror::Error;

/// Failures which stop a route search from producing any output. Note that
/// finding zero routes is not an error, an empty list is returned instead
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// Required parameters were missing from the request, or had values
    /// which cannot be used
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The road or elevation provider failed, or returned nothing usable
    #[error("upstream data unavailable: {0}")]
    UpstreamDataUnavailable(String),

    /// No nodes were left in the graph once it had been built and enriched
    #[error("no usable nodes remain in the road graph")]
    EmptyGraph,

    /// A configuration value could not be parsed
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A background task failed to complete
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures when talking to one of the external data providers
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> PipelineError {
        PipelineError::UpstreamDataUnavailable(err.to_string())
    }
}

//! This module contains structs which represent the route configuration
//! options selected by the end user, along with the service level settings
//! which are read from the environment at startup. The SearchParameters
//! struct is used widely across this package to inform the route search.

use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::error::PipelineError;
use crate::common::geo_math::Coordinate;

/// Sets the way in which the neighbours of a node are explored during the
/// route search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplorationMode {
    /// Try every neighbour, in a random order
    #[default]
    Exploratory,
    /// Only try the neighbour whose incline is closest to the optimal
    Greedy,
}

impl FromStr for ExplorationMode {
    type Err = String;

    fn from_str(input: &str) -> Result<ExplorationMode, Self::Err> {
        match input {
            "exploratory" => Ok(ExplorationMode::Exploratory),
            "greedy" => Ok(ExplorationMode::Greedy),
            other => Err(format!("unknown exploration mode '{other}'")),
        }
    }
}

/// Sets whether the average incline of a whole route must fall within the
/// overall tolerance of the optimal incline. By default it is only reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverallInclineRule {
    #[default]
    Report,
    Enforce,
}

impl FromStr for OverallInclineRule {
    type Err = String;

    fn from_str(input: &str) -> Result<OverallInclineRule, Self::Err> {
        match input {
            "report" => Ok(OverallInclineRule::Report),
            "enforce" => Ok(OverallInclineRule::Enforce),
            other => Err(format!("unknown overall incline rule '{other}'")),
        }
    }
}

/// An inclusive range of inclines, expressed as percentages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclineBand {
    pub min: f64,
    pub max: f64,
}

impl InclineBand {
    pub fn contains(&self, incline: f64) -> bool {
        (self.min..=self.max).contains(&incline)
    }
}

impl Default for InclineBand {
    /// Wider than any sensible target, so that short steep or downhill
    /// stretches are tolerated
    fn default() -> Self {
        InclineBand {
            min: -2.0,
            max: 5.0,
        }
    }
}

/// Stores the user's requested route configuration exactly as it is received
/// from the API
#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchRequest {
    pub origin: Option<Coordinate>,
    pub search_radius: Option<f64>,
    pub path_distance: Option<f64>,
    pub optimal_incline: Option<f64>,
    pub overall_tolerance: Option<f64>,
    pub local_tolerance: Option<f64>,
}

/// Settings which control the behaviour of the route search, these are set
/// for the whole service rather than per request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub exploration_mode: ExplorationMode,
    pub overall_rule: OverallInclineRule,
    pub local_band: InclineBand,
    pub max_routes: usize,
    pub start_sample_size: usize,
    pub max_steps_per_start: Option<usize>,
    pub parallel: bool,
    pub show_progress: bool,
    pub subdivision_threshold: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            exploration_mode: ExplorationMode::Exploratory,
            overall_rule: OverallInclineRule::Report,
            local_band: InclineBand::default(),
            max_routes: 10,
            start_sample_size: 200,
            max_steps_per_start: Some(100_000),
            parallel: false,
            show_progress: false,
            // Approx 50 metres
            subdivision_threshold: 0.031,
        }
    }
}

/// Details of the external services which provide road & elevation data
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub overpass_url: String,
    pub highways: Vec<String>,
    pub elevation_url: String,
    pub elevation_batch_size: usize,
    pub elevation_pacing_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            highways: [
                "residential",
                "tertiary",
                "unclassified",
                "path",
                "track",
                "footway",
            ]
            .iter()
            .map(|highway| highway.to_string())
            .collect(),
            elevation_url: "https://api.open-elevation.com/api/v1/lookup"
                .to_string(),
            elevation_batch_size: 200,
            elevation_pacing_ms: 1000,
        }
    }
}

/// All service level settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub search: SearchSettings,
    pub providers: ProviderSettings,
}

/// Fetch a single value via the provided lookup, falling back to the
/// default if it has not been set
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, PipelineError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            PipelineError::Configuration(format!(
                "{key} has an invalid value '{raw}'"
            ))
        }),
        None => Ok(default),
    }
}

impl Settings {
    /// Read settings from INCLINE_* environment variables
    pub fn from_env() -> Result<Settings, PipelineError> {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings using the provided lookup to fetch each variable, any
    /// variables which aren't set will take their default values
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, PipelineError> {
        let search_defaults = SearchSettings::default();
        let provider_defaults = ProviderSettings::default();

        let max_steps = parse_var(
            &lookup,
            "INCLINE_MAX_STEPS_PER_START",
            search_defaults.max_steps_per_start.unwrap_or(0),
        )?;

        let search = SearchSettings {
            exploration_mode: parse_var(
                &lookup,
                "INCLINE_EXPLORATION_MODE",
                search_defaults.exploration_mode,
            )?,
            overall_rule: parse_var(
                &lookup,
                "INCLINE_OVERALL_RULE",
                search_defaults.overall_rule,
            )?,
            local_band: InclineBand {
                min: parse_var(
                    &lookup,
                    "INCLINE_LOCAL_BAND_MIN",
                    search_defaults.local_band.min,
                )?,
                max: parse_var(
                    &lookup,
                    "INCLINE_LOCAL_BAND_MAX",
                    search_defaults.local_band.max,
                )?,
            },
            max_routes: parse_var(
                &lookup,
                "INCLINE_MAX_ROUTES",
                search_defaults.max_routes,
            )?,
            start_sample_size: parse_var(
                &lookup,
                "INCLINE_START_SAMPLE_SIZE",
                search_defaults.start_sample_size,
            )?,
            // Zero disables the limit
            max_steps_per_start: (max_steps > 0).then_some(max_steps),
            parallel: parse_var(
                &lookup,
                "INCLINE_PARALLEL",
                search_defaults.parallel,
            )?,
            show_progress: parse_var(
                &lookup,
                "INCLINE_SHOW_PROGRESS",
                search_defaults.show_progress,
            )?,
            subdivision_threshold: parse_var(
                &lookup,
                "INCLINE_SUBDIVISION_MILES",
                search_defaults.subdivision_threshold,
            )?,
        };

        let highways = match lookup("INCLINE_HIGHWAYS") {
            Some(raw) => raw
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            None => provider_defaults.highways,
        };

        let providers = ProviderSettings {
            overpass_url: lookup("INCLINE_OVERPASS_URL")
                .unwrap_or(provider_defaults.overpass_url),
            highways: highways,
            elevation_url: lookup("INCLINE_ELEVATION_URL")
                .unwrap_or(provider_defaults.elevation_url),
            elevation_batch_size: parse_var(
                &lookup,
                "INCLINE_ELEVATION_BATCH",
                provider_defaults.elevation_batch_size,
            )?,
            elevation_pacing_ms: parse_var(
                &lookup,
                "INCLINE_ELEVATION_PACING_MS",
                provider_defaults.elevation_pacing_ms,
            )?,
        };

        let settings = Settings {
            bind_addr: lookup("INCLINE_BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            search: search,
            providers: providers,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations of settings which would prevent the search from
    /// working at all
    fn validate(&self) -> Result<(), PipelineError> {
        let search = &self.search;
        if !(search.subdivision_threshold > 0.0) {
            return Err(PipelineError::Configuration(
                "subdivision threshold must be greater than zero".to_string(),
            ));
        }
        if !(search.local_band.min <= search.local_band.max) {
            return Err(PipelineError::Configuration(
                "local incline band minimum exceeds its maximum".to_string(),
            ));
        }
        if search.max_routes == 0 || search.start_sample_size == 0 {
            return Err(PipelineError::Configuration(
                "max routes and start sample size must be at least 1"
                    .to_string(),
            ));
        }
        if self.providers.highways.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one highway type must be requested".to_string(),
            ));
        }
        if self.providers.elevation_batch_size == 0 {
            return Err(PipelineError::Configuration(
                "elevation batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_addr: "0.0.0.0:8000".to_string(),
            search: SearchSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}

/// Stores the user's requested route configuration in a format which can be
/// used in the rest of this package, combined with the service level search
/// settings. It is expected that this will be created from a
/// UserSearchRequest using SearchParameters::from_request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParameters {
    pub origin: Coordinate,
    pub search_radius: f64,
    pub path_distance: f64,
    pub optimal_incline: f64,
    pub overall_tolerance: f64,
    pub local_tolerance: f64,
    pub max_routes: usize,
    pub start_sample_size: usize,
    pub exploration_mode: ExplorationMode,
    pub overall_rule: OverallInclineRule,
    pub local_band: InclineBand,
    pub max_steps_per_start: Option<usize>,
    pub parallel: bool,
    pub show_progress: bool,
}

/// Reject values which are negative or not finite
fn check_non_negative(name: &str, value: f64) -> Result<f64, PipelineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PipelineError::InvalidRequest(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

impl SearchParameters {
    /// Combine a request received from the API with the service settings.
    /// The origin and path distance must be provided, all other values fall
    /// back to defaults
    pub fn from_request(
        request: UserSearchRequest,
        settings: &SearchSettings,
    ) -> Result<SearchParameters, PipelineError> {
        let origin = request.origin.ok_or_else(|| {
            PipelineError::InvalidRequest("origin is required".to_string())
        })?;
        if !(origin.lat.is_finite() && origin.lon.is_finite()) {
            return Err(PipelineError::InvalidRequest(
                "origin must contain finite coordinates".to_string(),
            ));
        }

        let path_distance = request.path_distance.ok_or_else(|| {
            PipelineError::InvalidRequest(
                "pathDistance is required".to_string(),
            )
        })?;

        let optimal_incline = request.optimal_incline.unwrap_or(2.0);
        if !optimal_incline.is_finite() {
            return Err(PipelineError::InvalidRequest(
                "optimalIncline must be a finite number".to_string(),
            ));
        }

        Ok(SearchParameters {
            origin: origin,
            search_radius: check_non_negative(
                "searchRadius",
                request.search_radius.unwrap_or(5.0),
            )?,
            path_distance: check_non_negative("pathDistance", path_distance)?,
            optimal_incline: optimal_incline,
            overall_tolerance: check_non_negative(
                "overallTolerance",
                request.overall_tolerance.unwrap_or(0.10),
            )?,
            local_tolerance: check_non_negative(
                "localTolerance",
                request.local_tolerance.unwrap_or(0.01),
            )?,
            max_routes: settings.max_routes,
            start_sample_size: settings.start_sample_size,
            exploration_mode: settings.exploration_mode,
            overall_rule: settings.overall_rule,
            local_band: settings.local_band,
            max_steps_per_start: settings.max_steps_per_start,
            parallel: settings.parallel,
            show_progress: settings.show_progress,
        })
    }

    /// Radius of the area which needs to be loaded, routes can start
    /// anywhere in the search radius and then travel the full path distance
    pub fn fetch_radius(&self) -> f64 {
        self.search_radius + self.path_distance
    }

    /// The maximum distance which may be spent outside of the local incline
    /// band over the course of a route
    pub fn max_out_of_tolerance(&self) -> f64 {
        self.path_distance * self.local_tolerance
    }

    /// The range of average inclines which are considered close enough to
    /// the optimal incline
    pub fn overall_band(&self) -> InclineBand {
        let lower = self.optimal_incline * (1.0 - self.overall_tolerance);
        let upper = self.optimal_incline * (1.0 + self.overall_tolerance);
        InclineBand {
            min: lower.min(upper),
            max: lower.max(upper),
        }
    }
}

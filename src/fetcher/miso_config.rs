//! MISO endpoint configuration
//!
//! Each dataset differs only in its resource path and query parameters, so the
//! differences are data rather than code.
//!
//! - Day-ahead LMP: `/pricing/v1/day-ahead/{date}/lmp-expost?node={id}`
//! - Real-time LMP: `/pricing/v1/real-time/{date}/lmp-expost?node={id}`
//! - Load forecast: `/lgi/v1/forecast/{date}/load?region={id}&timeResolution=hourly`

use crate::fetcher::{FetcherError, FetcherResult};
use crate::{Dataset, FetchRequest, DATE_FORMAT};
use reqwest::Url;

/// Public MISO API gateway
pub const DEFAULT_BASE_URL: &str = "https://apim.misoenergy.org";

/// Header carrying the subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Endpoint shape for one dataset
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Path segment(s) before the date (e.g., /pricing/v1/day-ahead)
    pub path_prefix: &'static str,

    /// Resource after the date (e.g., /lmp-expost)
    pub resource: &'static str,

    /// Query parameter carrying the node/region
    pub identifier_param: &'static str,

    /// Fixed extra query parameters
    pub extra_query: &'static [(&'static str, &'static str)],
}

impl EndpointConfig {
    /// Path for a given date, e.g. `/pricing/v1/day-ahead/2023-04-01/lmp-expost`
    pub fn path(&self, date: chrono::NaiveDate) -> String {
        format!(
            "{}/{}{}",
            self.path_prefix,
            date.format(DATE_FORMAT),
            self.resource
        )
    }
}

/// Day-ahead ex-post LMP
pub const DAY_AHEAD_CONFIG: EndpointConfig = EndpointConfig {
    path_prefix: "/pricing/v1/day-ahead",
    resource: "/lmp-expost",
    identifier_param: "node",
    extra_query: &[],
};

/// Real-time ex-post LMP
pub const REAL_TIME_CONFIG: EndpointConfig = EndpointConfig {
    path_prefix: "/pricing/v1/real-time",
    resource: "/lmp-expost",
    identifier_param: "node",
    extra_query: &[],
};

/// Hourly load forecast
pub const LOAD_FORECAST_CONFIG: EndpointConfig = EndpointConfig {
    path_prefix: "/lgi/v1/forecast",
    resource: "/load",
    identifier_param: "region",
    extra_query: &[("timeResolution", "hourly")],
};

/// Endpoint configuration for a dataset
pub fn endpoint_config(dataset: Dataset) -> &'static EndpointConfig {
    match dataset {
        Dataset::DayAheadLmp => &DAY_AHEAD_CONFIG,
        Dataset::RealTimeLmp => &REAL_TIME_CONFIG,
        Dataset::LoadForecast => &LOAD_FORECAST_CONFIG,
    }
}

/// Build the request URL for one day
///
/// The result depends only on `base_url` and the request's dataset, date and
/// identifier.
pub fn build_url(base_url: &str, request: &FetchRequest) -> FetcherResult<Url> {
    let config = endpoint_config(request.dataset);
    let raw = format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        config.path(request.date)
    );

    let mut url = Url::parse(&raw)
        .map_err(|e| FetcherError::Transport(format!("Invalid URL '{raw}': {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair(config.identifier_param, request.identifier.as_str());
        for (key, value) in config.extra_query {
            query.append_pair(key, value);
        }
    }

    Ok(url)
}

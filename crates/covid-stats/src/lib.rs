//! # COVID Stats
//!
//! Client for the per-country statistics endpoint
//! (`GET {base}/countries/{country}`) of the disease.sh API.
//!
//! The endpoint answers with one of two JSON shapes: an error object carrying
//! a `message`, or the country's counters. [`StatsResponse`] decodes the two
//! explicitly; anything else is a [`StatsError::Decode`].
//!
//! ```rust,ignore
//! use covid_stats::{DiseaseShClient, StatsResponse, StatsSource};
//!
//! let client = DiseaseShClient::new("https://disease.sh/v3/covid-19");
//! match client.country("nigeria").await? {
//!     StatsResponse::Found(stats) => println!("{} cases", stats.cases),
//!     StatsResponse::NotFound { message } => println!("{message}"),
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://disease.sh/v3/covid-19";

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The request never produced a response body.
    #[error("http error: {0}")]
    Http(String),
    /// The body was not one of the two known shapes.
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Counters for one country. Other fields the API returns are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStats {
    pub today_cases: u64,
    pub recovered: u64,
    pub deaths: u64,
    pub cases: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsResponse {
    /// The service reported an error itself, e.g. an unknown country.
    NotFound { message: String },
    Found(CountryStats),
}

impl StatsResponse {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, StatsError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| StatsError::Decode(format!("invalid json: {}", e)))?;
        Self::from_value(value)
    }

    /// A `message` field selects the error shape, whatever else is present.
    pub fn from_value(value: Value) -> Result<Self, StatsError> {
        let Value::Object(ref map) = value else {
            return Err(StatsError::Decode(format!(
                "expected a json object, got {}",
                kind(&value)
            )));
        };
        if let Some(message) = map.get("message") {
            return match message {
                Value::String(message) => Ok(StatsResponse::NotFound {
                    message: message.clone(),
                }),
                other => Err(StatsError::Decode(format!(
                    "`message` should be a string, got {}",
                    kind(other)
                ))),
            };
        }
        serde_json::from_value(value)
            .map(StatsResponse::Found)
            .map_err(|e| StatsError::Decode(e.to_string()))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Anything that can look up a country's counters.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn country(&self, country: &str) -> Result<StatsResponse, StatsError>;
}

/// disease.sh REST client.
#[derive(Clone, Debug)]
pub struct DiseaseShClient {
    /// API base URL; override for testing/mocking.
    pub base_url: String,
    http: reqwest::Client,
}

impl DiseaseShClient {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// `{base}/countries/{country}` with `country` escaped as a single path segment.
    ///
    /// `.` and `..` are refused: URL parsing collapses them (and their `%2E`
    /// spellings) into the parent path, which would query the country list.
    pub fn country_url(&self, country: &str) -> Result<Url, StatsError> {
        if matches!(country, "." | "..") {
            return Err(StatsError::InvalidUrl(format!(
                "`{}` cannot be sent as a country path segment",
                country
            )));
        }
        let mut url =
            Url::parse(&self.base_url).map_err(|e| StatsError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StatsError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("countries")
            .push(country);
        Ok(url)
    }
}

impl Default for DiseaseShClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl StatsSource for DiseaseShClient {
    async fn country(&self, country: &str) -> Result<StatsResponse, StatsError> {
        let url = self.country_url(country)?;
        debug!(%url, "fetching country stats");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StatsError::Http(e.to_string()))?;

        // The error shape comes back with a 404, so the status is not used
        // to tell the shapes apart.
        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|e| StatsError::Http(e.to_string()))?;

        StatsResponse::from_slice(&body).inspect_err(|e| {
            warn!(%status, error = %e, "undecodable stats response");
        })
    }
}

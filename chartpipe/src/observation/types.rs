//! Wire types for the observation and event APIs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from the observation API layer.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ObservationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ObservationError::Parse(err.to_string())
        } else {
            ObservationError::Http(err.to_string())
        }
    }
}

/// One observed value of a stat var for an entity.
///
/// The API returns an empty object for entities without data, which
/// deserializes to a default observation; use [`Observation::is_empty`]
/// to detect that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Observation {
    pub date: String,
    pub value: Option<f64>,
    pub facet: String,
}

impl Observation {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.date.is_empty()
    }
}

/// A dated series of observations for one entity, all from one facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub series: Vec<Observation>,
    pub facet: String,
}

impl Series {
    /// The observation whose date exactly matches `date`, if any.
    /// No interpolation is ever performed.
    pub fn value_at(&self, date: &str) -> Option<&Observation> {
        self.series.iter().find(|obs| obs.date == date)
    }
}

/// A (source, measurement method, unit) tuple identifying one
/// provenance of an observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacetMetadata {
    pub provenance_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_display_name: Option<String>,
}

/// Response from `/api/observations/point[/within]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointResponse {
    /// stat var -> entity -> observation
    pub data: HashMap<String, HashMap<String, Observation>>,
    pub facets: HashMap<String, FacetMetadata>,
}

impl PointResponse {
    /// The observation for `(stat_var, entity)` when present and
    /// non-empty.
    pub fn observation(&self, stat_var: &str, entity: &str) -> Option<&Observation> {
        self.data
            .get(stat_var)?
            .get(entity)
            .filter(|obs| !obs.is_empty())
    }
}

/// Response from `/api/observations/series[/within]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesResponse {
    /// stat var -> entity -> series
    pub data: HashMap<String, HashMap<String, Series>>,
    pub facets: HashMap<String, FacetMetadata>,
}

impl SeriesResponse {
    pub fn series(&self, stat_var: &str, entity: &str) -> Option<&Series> {
        self.data
            .get(stat_var)?
            .get(entity)
            .filter(|s| !s.series.is_empty())
    }
}

/// One disaster event returned by the event data endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisasterEvent {
    pub dcid: String,
    pub name: String,
    pub event_type: String,
    pub places: Vec<String>,
    pub start_date: String,
    /// Severity property name -> value, e.g. `"area" -> 152.0`.
    pub severity: HashMap<String, f64>,
    pub provenance_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventProvenance {
    pub domain: String,
    pub import_name: String,
    pub provenance_url: String,
}

/// Response from the disaster event data endpoint; one response serves
/// every tile in a disaster block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventApiResponse {
    pub events: Vec<DisasterEvent>,
    pub provenance_info: HashMap<String, EventProvenance>,
}

//! Event type specs for disaster event blocks.

use serde::{Deserialize, Serialize};

/// Describes one disaster event type (fires, floods, storms, ...).
///
/// Disaster tiles reference these by id via their `eventTypeKeys`; the
/// specs themselves live in the page metadata so that one block-level
/// event data fetch can serve every tile in the block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventTypeSpec {
    pub id: String,
    pub name: String,
    /// The dcids of the event types to fetch data for.
    pub event_type_dcids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Severity property used to rank events, e.g. "area".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_severity_filter: Option<SeverityFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeverityFilter {
    pub prop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_limit: Option<f64>,
}

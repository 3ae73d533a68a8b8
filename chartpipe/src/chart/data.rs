//! Intermediate chart data structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One plotted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcid: Option<String>,
}

impl DataPoint {
    pub fn new(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
            date: None,
            dcid: None,
        }
    }
}

/// A labeled series of data points, e.g. one place's values across
/// variables, or one variable's values across dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGroup {
    pub label: String,
    pub points: Vec<DataPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl DataGroup {
    pub fn new(label: &str, points: Vec<DataPoint>) -> Self {
        Self {
            label: label.to_string(),
            points,
            link: None,
        }
    }
}

/// The normalized, renderable intermediate for one tile.
///
/// `error_msg` is the single authoritative empty-state signal: it is
/// non-empty exactly when no data survived normalization, and no other
/// component second-guesses emptiness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartData {
    pub data_groups: Vec<DataGroup>,
    /// Provenance URLs, deterministically ordered.
    pub sources: BTreeSet<String>,
    pub unit: String,
    pub date_range: String,
    pub error_msg: String,
    pub place_name: String,
}

impl ChartData {
    pub fn has_data(&self) -> bool {
        self.error_msg.is_empty()
    }
}

/// One entity's value in a ranking, also used for population ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingPoint {
    pub place_dcid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl RankingPoint {
    pub fn label(&self) -> &str {
        self.place_name.as_deref().unwrap_or(&self.place_dcid)
    }
}

/// One place's paired values in a scatter plot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScatterPoint {
    pub place_dcid: String,
    pub place_name: String,
    pub x_value: f64,
    pub x_date: String,
    pub y_value: f64,
    pub y_date: String,
}

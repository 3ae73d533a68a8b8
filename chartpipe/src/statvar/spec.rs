//! The stat var spec type.

use serde::{Deserialize, Serialize};

/// Identifies one plotted quantity.
///
/// `stat_var` is required and immutable once created. The optional
/// fields refine how observations are fetched and displayed:
/// a denominator for per-capita division, a display unit, a scaling
/// factor, a fixed date and a preferred facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarSpec {
    pub stat_var: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StatVarSpec {
    /// A spec with only the stat var set.
    pub fn for_stat_var(stat_var: &str) -> Self {
        Self {
            stat_var: stat_var.to_string(),
            ..Default::default()
        }
    }

    /// Display name for this variable, falling back to the dcid.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.stat_var)
    }
}

//! The pipeline's external output unit.

use super::TileType;
use serde::{Deserialize, Serialize};

/// One source attribution entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub name: String,
    pub url: String,
}

impl SourceAttribution {
    /// Builds an attribution from a provenance URL, with a display name
    /// stripped of protocol and `www.` prefixes.
    pub fn from_url(url: &str) -> Self {
        let name = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("www.");
        let name = name.trim_end_matches('/');
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// The rendered form of a tile: a stateless chart URL or an inline SVG
/// document, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TileArtifact {
    ChartUrl(String),
    Svg(String),
}

/// A numeric highlight value with its observation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub value: f64,
    pub date: String,
}

/// One resolved chart, ready for a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileResult {
    pub srcs: Vec<SourceAttribution>,
    pub title: String,
    #[serde(rename = "type")]
    pub tile_type: TileType,
    pub vars: Vec<String>,
    pub places: Vec<String>,
    #[serde(rename = "placeType", skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_csv: Option<String>,
    #[serde(flatten)]
    pub artifact: TileArtifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

impl TileResult {
    /// A result skeleton for `tile_type`; artifact is set by the
    /// builder once rendering mode is known.
    pub fn new(tile_type: TileType, title: &str, artifact: TileArtifact) -> Self {
        Self {
            srcs: Vec::new(),
            title: title.to_string(),
            tile_type,
            vars: Vec::new(),
            places: Vec::new(),
            place_type: None,
            legend: None,
            data_csv: None,
            artifact,
            unit: None,
            highlight: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_strips_protocol_and_www() {
        let src = SourceAttribution::from_url("https://www.census.gov/");
        assert_eq!(src.name, "census.gov");
        assert_eq!(src.url, "https://www.census.gov/");
        let bare = SourceAttribution::from_url("census.gov");
        assert_eq!(bare.name, "census.gov");
    }

    #[test]
    fn test_artifact_is_a_single_json_field() {
        let result = TileResult::new(
            TileType::Bar,
            "Population",
            TileArtifact::ChartUrl("https://example.org/nodejs/chart?props=x".to_string()),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("chartUrl").is_some());
        assert!(json.get("svg").is_none());
        assert_eq!(json["type"], "BAR");

        let svg = TileResult::new(TileType::Line, "t", TileArtifact::Svg("<svg/>".to_string()));
        let json = serde_json::to_value(&svg).unwrap();
        assert!(json.get("svg").is_some());
        assert!(json.get("chartUrl").is_none());
    }
}

//! Tile configuration: the closed union of chart kinds.
//!
//! Each tile kind carries only the sub-spec fields relevant to it, so
//! the dispatcher routes on the variant instead of probing for
//! properties at runtime.

use crate::tile::TileType;
use serde::{Deserialize, Serialize};

/// Sort orders understood by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    AscendingPopulation,
    DescendingPopulation,
    Ascending,
    Descending,
}

/// Describes one chart tile within a column.
///
/// `stat_var_key` entries must resolve against the enclosing category's
/// spec map; an unresolvable key yields no spec and is dropped, never a
/// pipeline failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stat_var_key: Vec<String>,
    #[serde(flatten)]
    pub kind: TileKind,
}

/// The chart kind, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileKind {
    Bar(BarTileSpec),
    Line,
    Map,
    Scatter,
    Ranking(RankingTileSpec),
    Donut(DonutTileSpec),
    Gauge(GaugeTileSpec),
    Histogram,
    Highlight,
    DisasterEventMap(DisasterMapTileSpec),
    TopEvent(TopEventTileSpec),
}

impl Default for TileKind {
    fn default() -> Self {
        TileKind::Line
    }
}

impl TileKind {
    /// The plain type tag for this kind, used by allow-lists and
    /// result annotation.
    pub fn tile_type(&self) -> TileType {
        match self {
            TileKind::Bar(_) => TileType::Bar,
            TileKind::Line => TileType::Line,
            TileKind::Map => TileType::Map,
            TileKind::Scatter => TileType::Scatter,
            TileKind::Ranking(_) => TileType::Ranking,
            TileKind::Donut(_) => TileType::Donut,
            TileKind::Gauge(_) => TileType::Gauge,
            TileKind::Histogram => TileType::Histogram,
            TileKind::Highlight => TileType::Highlight,
            TileKind::DisasterEventMap(_) => TileType::DisasterEventMap,
            TileKind::TopEvent(_) => TileType::TopEvent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BarTileSpec {
    /// Maximum number of places to display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_places: Option<usize>,
    /// Maximum number of variables to display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_variables: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingTileSpec {
    pub show_highest: bool,
    pub show_lowest: bool,
    /// Show highest and lowest in a single ranking unit; suppresses the
    /// separate lowest unit.
    pub show_highest_lowest: bool,
    /// One ranking table across all stat vars instead of one per var.
    pub show_multi_column: bool,
    /// Number of ranked places per unit; 0 means the default of 5.
    pub ranking_count: usize,
}

impl RankingTileSpec {
    pub fn count(&self) -> usize {
        if self.ranking_count == 0 {
            5
        } else {
            self.ranking_count
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DonutTileSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_variables: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GaugeTileSpec {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisasterMapTileSpec {
    /// Keys into the page metadata's event type spec map.
    pub event_type_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopEventTileSpec {
    /// Key into the page metadata's event type spec map.
    pub event_type_key: String,
    /// Number of events to list; 0 means the default of 10.
    pub ranking_count: usize,
}

impl TopEventTileSpec {
    pub fn count(&self) -> usize {
        if self.ranking_count == 0 {
            10
        } else {
            self.ranking_count
        }
    }
}

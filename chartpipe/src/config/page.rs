//! Page-level configuration types: categories, blocks and columns.

use super::event::EventTypeSpec;
use super::tile::TileConfig;
use crate::statvar::StatVarSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A place, identified by dcid, with its display name and types.
///
/// Contained-in tiles treat this as the parent place and additionally
/// carry an enclosed place type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceSpec {
    pub dcid: String,
    pub name: String,
    pub types: Vec<String>,
}

impl PlaceSpec {
    pub fn new(dcid: &str, name: &str, types: &[&str]) -> Self {
        Self {
            dcid: dcid.to_string(),
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Top-level page configuration returned by the NL fulfillment service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageConfig {
    pub metadata: PageMetadata,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetadata {
    /// Map of place type to the child place type to use for
    /// contained-in tiles, e.g. `"State" -> "County"`.
    pub contained_place_types: HashMap<String, String>,
    /// Map of event type id to its spec, shared by disaster blocks.
    pub event_type_spec: HashMap<String, EventTypeSpec>,
}

/// A category owns the stat var spec map its tiles resolve against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub title: String,
    pub stat_var_spec: HashMap<String, StatVarSpec>,
    pub blocks: Vec<Block>,
}

/// Block-level type tag. Disaster event blocks share one event data
/// fetch across all of their tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    #[default]
    Default,
    DisasterEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Denominator stat var applied to all tiles in this block when
    /// `start_with_denom` is set.
    pub denom: String,
    pub start_with_denom: bool,
    pub columns: Vec<Column>,
}

impl Block {
    /// The block-level denominator override, empty when per-capita is
    /// not the block's starting state.
    pub fn block_denom(&self) -> &str {
        if self.start_with_denom {
            &self.denom
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub tiles: Vec<TileConfig>,
}

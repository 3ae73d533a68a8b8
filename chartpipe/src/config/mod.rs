//! Subject-page configuration model.
//!
//! A page configuration is a tree of categories, blocks, columns and
//! tiles. Each category owns a stat var spec map that its tiles resolve
//! their `statVarKey` entries against; resolution flows strictly
//! downward (category, block, column, then tile) and no tile mutates an
//! ancestor's spec map.

mod event;
mod page;
mod tile;

pub use event::{EventTypeSpec, SeverityFilter};
pub use page::{Block, BlockType, Category, Column, PageConfig, PageMetadata, PlaceSpec};
pub use tile::{
    BarTileSpec, DisasterMapTileSpec, DonutTileSpec, GaugeTileSpec, RankingTileSpec, SortOrder,
    TileConfig, TileKind, TopEventTileSpec,
};

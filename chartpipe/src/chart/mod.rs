//! Normalized chart data and the normalizer.
//!
//! The normalizer converts raw observation responses into the per-tile
//! intermediate [`ChartData`] structure: per-capita division, scaling
//! and unit overrides, population ranking and truncation, source
//! attribution and date-range computation. A `ChartData` is created
//! fresh per fetch cycle and immutable once constructed.

mod csv;
mod data;
mod date;
mod normalize;
mod unit;

pub use csv::{
    data_groups_to_csv, ranking_points_to_csv, ranking_table_to_csv, scatter_points_to_csv,
};
pub use data::{ChartData, DataGroup, DataPoint, RankingPoint, ScatterPoint};
pub use date::date_range;
pub use normalize::{
    no_data_error_msg, normalize_point, normalize_series, rank_entities, ranking_points,
    NormalizePolicy,
};
pub use unit::{StatFormat, UnitOverride, UnitOverrideConfig};

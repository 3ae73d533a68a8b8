//! Stat var specs and their resolver.
//!
//! A [`StatVarSpec`] identifies one plotted quantity. Specs are
//! immutable: block-level overrides (denominator, date snapping, facet
//! overrides) produce new spec values, never mutate the category's map.

mod provider;
mod spec;

pub use provider::{SpecOverrides, StatVarProvider};
pub use spec::StatVarSpec;

/// Sentinel date meaning "snap to the date with the highest coverage".
pub const HIGHEST_COVERAGE_DATE: &str = "HIGHEST_COVERAGE";

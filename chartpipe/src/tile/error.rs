//! Tile-level error type.

use crate::codec::CodecError;
use crate::observation::ObservationError;
use crate::render::RenderError;
use thiserror::Error;

/// Any failure while resolving one tile.
///
/// These never escape the dispatcher: [`super::resolve_tile`] logs them
/// and yields no results for the tile.
#[derive(Debug, Error)]
pub enum TileError {
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("shared event fetch failed: {0}")]
    Event(String),
    #[error("tile configuration error: {0}")]
    Config(String),
}

//! Observation API access.
//!
//! This module provides the wire types for the observation endpoints
//! and the [`ObservationApi`] trait abstracting the HTTP client, with a
//! reqwest implementation for production and a mock for tests.
//!
//! Fetchers never swallow errors: a failed fetch is one
//! [`ObservationError`] propagated to the tile dispatcher, which is the
//! only place tile-level failures are observed.

mod align;
mod client;
mod types;

pub use align::align_point_units;
pub use client::{ObservationApi, ReqwestObservationClient};
#[cfg(test)]
pub use client::tests::MockObservationApi;
pub use types::{
    DisasterEvent, EventApiResponse, EventProvenance, FacetMetadata, Observation,
    ObservationError, PointResponse, Series, SeriesResponse,
};

/// Marker variable fetched alongside every point request to rank and
/// cap the number of places shown.
pub const FILTER_STAT_VAR: &str = "Count_Person";

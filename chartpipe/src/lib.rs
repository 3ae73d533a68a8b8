//! Chartpipe - Tile data resolution and chart rendering pipeline
//!
//! This library resolves abstract chart descriptions (a place, an
//! enclosed-place-type, statistical-variable specs and a tile type) into
//! renderable chart artifacts. Raw observations are fetched concurrently
//! from the observation API, normalized (per-capita division, unit
//! scaling, date alignment, source attribution) and emitted as a
//! [`tile::TileResult`] carrying either a stateless chart URL or a
//! rendered SVG.
//!
//! # High-Level API
//!
//! For most use cases, the [`query`] module provides the orchestrator
//! facade:
//!
//! ```ignore
//! use chartpipe::observation::ReqwestObservationClient;
//! use chartpipe::query::{QueryOptions, QueryOrchestrator, ReqwestNlClient};
//! use chartpipe::tile::TileContext;
//! use std::sync::Arc;
//!
//! let api = Arc::new(ReqwestObservationClient::new("https://datacommons.org")?);
//! let nl = Arc::new(ReqwestNlClient::new("https://datacommons.org")?);
//! let ctx = TileContext::new(api, "https://datacommons.org", "");
//! let orchestrator = QueryOrchestrator::new(nl, ctx);
//!
//! let result = orchestrator
//!     .run_query("population of california counties", &QueryOptions::default())
//!     .await;
//! ```

pub mod chart;
pub mod codec;
pub mod config;
pub mod logging;
pub mod observation;
pub mod query;
pub mod render;
pub mod server;
pub mod statvar;
pub mod tile;

/// Version of the chartpipe library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

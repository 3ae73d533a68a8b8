//! Tile resolution: fetch, normalize and render one chart.
//!
//! The dispatcher routes on the tile kind to the matching
//! fetch+normalize+build function and is the single error boundary for
//! tile work: any failure is logged here and yields no results, so a
//! bad tile never affects its siblings.

mod bar;
mod disaster;
mod error;
mod generation;
mod highlight;
mod line;
mod map;
mod ranking;
mod result;
mod scatter;

pub use disaster::{shared_event_fetch, SharedEventData};
pub use error::TileError;
pub use generation::RequestGeneration;
pub use result::{Highlight, SourceAttribution, TileArtifact, TileResult};

use crate::chart::{rank_entities, ChartData, RankingPoint, UnitOverrideConfig};
use crate::codec::{chart_url, ChartProps};
use crate::config::{EventTypeSpec, PlaceSpec, TileConfig, TileKind};
use crate::observation::{
    align_point_units, ObservationApi, PointResponse, SeriesResponse, FILTER_STAT_VAR,
};
use crate::render::SvgRenderer;
use crate::statvar::StatVarSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Plain tile type tags, used for allow-lists and result annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    Bar,
    Line,
    Map,
    Scatter,
    Ranking,
    Donut,
    Gauge,
    Histogram,
    Highlight,
    DisasterEventMap,
    TopEvent,
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TileType::Bar => "BAR",
            TileType::Line => "LINE",
            TileType::Map => "MAP",
            TileType::Scatter => "SCATTER",
            TileType::Ranking => "RANKING",
            TileType::Donut => "DONUT",
            TileType::Gauge => "GAUGE",
            TileType::Histogram => "HISTOGRAM",
            TileType::Highlight => "HIGHLIGHT",
            TileType::DisasterEventMap => "DISASTER_EVENT_MAP",
            TileType::TopEvent => "TOP_EVENT",
        };
        f.write_str(tag)
    }
}

/// Lifecycle of one tile resolution. `Failed` is terminal and never
/// retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Pending,
    Fetching,
    Succeeded,
    Failed,
}

/// Shared collaborators for tile resolution.
#[derive(Clone)]
pub struct TileContext {
    pub api: Arc<dyn ObservationApi>,
    /// Root of the explorer site, used for place deep links.
    pub api_root: String,
    /// Root under which this process's chart endpoint is served.
    pub url_root: String,
    pub api_key: String,
    /// When absent, tiles emit stateless chart URLs instead of SVG.
    pub renderer: Option<Arc<dyn SvgRenderer>>,
    pub unit_overrides: UnitOverrideConfig,
}

impl TileContext {
    /// A context with no renderer and the default unit overrides; tiles
    /// emit stateless chart URLs.
    pub fn new(api: Arc<dyn ObservationApi>, api_root: &str, api_key: &str) -> Self {
        Self {
            api,
            api_root: api_root.trim_end_matches('/').to_string(),
            url_root: api_root.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            renderer: None,
            unit_overrides: UnitOverrideConfig::default(),
        }
    }
}

/// Everything one tile resolution needs besides the context.
#[derive(Clone)]
pub struct TileRequest {
    pub tile: TileConfig,
    pub place: PlaceSpec,
    pub enclosed_place_type: Option<String>,
    pub specs: Arc<Vec<StatVarSpec>>,
    pub event_spec: Option<EventTypeSpec>,
    pub event_data: Option<SharedEventData>,
}

/// Resolves one tile to zero or more results.
///
/// This is the sole error boundary for tile work: failures are logged
/// with the tile title and swallowed. Some kinds (ranking) legitimately
/// produce several results from one config.
pub async fn resolve_tile(ctx: &TileContext, req: &TileRequest) -> Vec<TileResult> {
    debug!(
        tile = %req.tile.title,
        kind = %req.tile.kind.tile_type(),
        state = ?TileState::Fetching,
        "resolving tile"
    );
    let outcome = match &req.tile.kind {
        TileKind::Bar(_) | TileKind::Donut(_) | TileKind::Gauge(_) | TileKind::Histogram => {
            bar::build(ctx, req).await
        }
        TileKind::Line => line::build(ctx, req).await,
        TileKind::Map => map::build(ctx, req).await,
        TileKind::Scatter => scatter::build(ctx, req).await,
        TileKind::Ranking(_) => ranking::build(ctx, req).await,
        TileKind::Highlight => highlight::build(ctx, req).await,
        TileKind::DisasterEventMap(_) => disaster::build_map(ctx, req).await,
        TileKind::TopEvent(_) => disaster::build_top_event(ctx, req).await,
    };
    match outcome {
        Ok(results) => {
            debug!(
                tile = %req.tile.title,
                results = results.len(),
                state = ?TileState::Succeeded,
                "tile resolved"
            );
            results
        }
        Err(error) => {
            warn!(tile = %req.tile.title, state = ?TileState::Failed, %error, "tile failed");
            Vec::new()
        }
    }
}

/// Resolves one tile under a last-props-wins generation slot.
///
/// Begins a new generation on `slot` before fetching, invalidating any
/// earlier resolution still in flight for the same slot, and applies
/// the outcome only when that generation is still the latest. Returns
/// `None` when a newer resolution superseded this one while it was in
/// flight; the stale results are discarded, never merged.
pub async fn resolve_tile_latest(
    ctx: &TileContext,
    req: &TileRequest,
    slot: &RequestGeneration,
) -> Option<Vec<TileResult>> {
    let generation = slot.begin();
    let results = resolve_tile(ctx, req).await;
    let outcome = slot.apply(generation, results);
    if outcome.is_none() {
        debug!(tile = %req.tile.title, generation, "discarding superseded tile resolution");
    }
    outcome
}

/// Substitutes `${placeName}` and `${date}` placeholders in a title.
pub(crate) fn format_title(template: &str, place_name: &str, date_range: &str) -> String {
    template
        .replace("${placeName}", place_name)
        .replace("${date}", date_range)
}

/// Joined responses for a point-based tile.
pub(crate) struct PointFetch {
    pub point: PointResponse,
    pub denom: Option<SeriesResponse>,
    pub ranked: Vec<RankingPoint>,
    pub place_names: HashMap<String, String>,
}

/// Fetches the primary point response together with the denominator
/// series and population ranking fetches, all raced concurrently.
///
/// A failed or empty population fetch degrades to an unordered entity
/// set from the primary response; primary and denominator failures
/// propagate.
pub(crate) async fn fetch_point(
    ctx: &TileContext,
    req: &TileRequest,
    sort: Option<crate::config::SortOrder>,
) -> Result<PointFetch, TileError> {
    let variables = stat_vars(&req.specs);
    let denoms = denom_vars(&req.specs);
    let date = req
        .specs
        .first()
        .and_then(|s| s.date.clone())
        .unwrap_or_default();
    let place = std::slice::from_ref(&req.place.dcid);
    let pop_var = [FILTER_STAT_VAR.to_string()];

    let primary = async {
        match &req.enclosed_place_type {
            Some(child_type) => {
                ctx.api
                    .get_point_within(&req.place.dcid, child_type, &variables, &date)
                    .await
            }
            None => ctx.api.get_point(place, &variables, &date).await,
        }
    };
    let denom = async {
        if denoms.is_empty() {
            return Ok(None);
        }
        match &req.enclosed_place_type {
            Some(child_type) => ctx
                .api
                .get_series_within(&req.place.dcid, child_type, &denoms)
                .await
                .map(Some),
            None => ctx.api.get_series(place, &denoms).await.map(Some),
        }
    };
    let population = async {
        match &req.enclosed_place_type {
            Some(child_type) => Some(
                ctx.api
                    .get_point_within(&req.place.dcid, child_type, &pop_var, "")
                    .await,
            ),
            None => None,
        }
    };
    let (primary, denom, population) = tokio::join!(primary, denom, population);
    let mut point = primary?;
    let denom = denom?;
    // Contained-in responses can mix facet units per variable; keep
    // only each variable's majority unit so values stay comparable.
    if req.enclosed_place_type.is_some() {
        point = align_point_units(point, &[]);
    }

    let ranked = match population {
        Some(Ok(pop)) if pop.data.get(FILTER_STAT_VAR).map(|d| !d.is_empty()).unwrap_or(false) => {
            rank_entities(&pop, sort)
        }
        Some(Err(error)) => {
            warn!(place = %req.place.dcid, %error, "population fetch failed, using unranked entities");
            rank_entities(&point, sort)
        }
        Some(Ok(_)) => rank_entities(&point, sort),
        None => vec![RankingPoint {
            place_dcid: req.place.dcid.clone(),
            ..Default::default()
        }],
    };

    let place_names = if req.enclosed_place_type.is_some() {
        let dcids: Vec<String> = ranked.iter().map(|p| p.place_dcid.clone()).collect();
        ctx.api.get_place_names(&dcids).await?
    } else {
        let mut names = HashMap::new();
        names.insert(req.place.dcid.clone(), req.place.name.clone());
        names
    };

    Ok(PointFetch {
        point,
        denom,
        ranked,
        place_names,
    })
}

/// Joined responses for a series-based tile.
pub(crate) struct SeriesFetch {
    pub series: SeriesResponse,
    pub denom: Option<SeriesResponse>,
    pub entities: Vec<String>,
    pub place_names: HashMap<String, String>,
}

pub(crate) async fn fetch_series(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<SeriesFetch, TileError> {
    let variables = stat_vars(&req.specs);
    let denoms = denom_vars(&req.specs);
    let place = std::slice::from_ref(&req.place.dcid);

    let primary = async {
        match &req.enclosed_place_type {
            Some(child_type) => {
                ctx.api
                    .get_series_within(&req.place.dcid, child_type, &variables)
                    .await
            }
            None => ctx.api.get_series(place, &variables).await,
        }
    };
    let denom = async {
        if denoms.is_empty() {
            return Ok(None);
        }
        match &req.enclosed_place_type {
            Some(child_type) => ctx
                .api
                .get_series_within(&req.place.dcid, child_type, &denoms)
                .await
                .map(Some),
            None => ctx.api.get_series(place, &denoms).await.map(Some),
        }
    };
    let (primary, denom) = tokio::join!(primary, denom);
    let series = primary?;
    let denom = denom?;

    let entities: Vec<String> = if req.enclosed_place_type.is_some() {
        let mut seen: Vec<String> = Vec::new();
        for entity_series in series.data.values() {
            for entity in entity_series.keys() {
                if !seen.contains(entity) {
                    seen.push(entity.clone());
                }
            }
        }
        seen.sort();
        seen
    } else {
        vec![req.place.dcid.clone()]
    };
    let place_names = if req.enclosed_place_type.is_some() {
        ctx.api.get_place_names(&entities).await?
    } else {
        let mut names = HashMap::new();
        names.insert(req.place.dcid.clone(), req.place.name.clone());
        names
    };

    Ok(SeriesFetch {
        series,
        denom,
        entities,
        place_names,
    })
}

/// Assembles a [`TileResult`] from normalized chart data: sources,
/// title substitution, and the chart URL or rendered SVG artifact.
pub(crate) async fn build_result(
    ctx: &TileContext,
    req: &TileRequest,
    chart: &ChartData,
    data_csv: Option<String>,
    legend: Option<Vec<String>>,
) -> Result<TileResult, TileError> {
    let title = format_title(&req.tile.title, &req.place.name, &chart.date_range);
    let artifact = match &ctx.renderer {
        Some(renderer) => TileArtifact::Svg(renderer.render(&req.tile, chart).await?),
        None => TileArtifact::ChartUrl(chart_url(&ctx.url_root, &ctx.api_key, &chart_props(req))?),
    };
    let mut result = TileResult::new(req.tile.kind.tile_type(), &title, artifact);
    result.srcs = chart
        .sources
        .iter()
        .map(|url| SourceAttribution::from_url(url))
        .collect();
    result.vars = req.specs.iter().map(|s| s.stat_var.clone()).collect();
    result.places = vec![req.place.dcid.clone()];
    result.place_type = req.enclosed_place_type.clone();
    result.data_csv = data_csv;
    result.legend = legend;
    if !chart.unit.is_empty() {
        result.unit = Some(chart.unit.clone());
    }
    Ok(result)
}

/// The codec payload for a tile, with resolved specs inlined and the
/// symbolic keys stripped.
pub(crate) fn chart_props(req: &TileRequest) -> ChartProps {
    let mut tile_config = req.tile.clone();
    tile_config.stat_var_key.clear();
    ChartProps {
        place: req.place.dcid.clone(),
        enclosed_place_type: req.enclosed_place_type.clone(),
        stat_var_spec: req.specs.as_ref().clone(),
        tile_config,
        event_type_spec: req.event_spec.clone(),
    }
}

fn stat_vars(specs: &[StatVarSpec]) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for spec in specs {
        if !vars.contains(&spec.stat_var) {
            vars.push(spec.stat_var.clone());
        }
    }
    vars
}

fn denom_vars(specs: &[StatVarSpec]) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for spec in specs {
        if let Some(denom) = &spec.denom {
            if !vars.contains(denom) {
                vars.push(denom.clone());
            }
        }
    }
    vars
}

//! Multi-tile query orchestration.
//!
//! Fans a natural-language query out into many independent tile
//! resolutions with partial-failure isolation: one bad tile never
//! invalidates its siblings, and only failures outside the per-tile
//! boundary (the NL call, a panicked task) abort the whole query.

mod nl;

pub use nl::{NlApi, NlError, NlPlace, NlResponse, RelatedThings, ReqwestNlClient};
#[cfg(test)]
pub use nl::tests::MockNlApi;

use crate::config::{Block, BlockType, PageConfig, PlaceSpec, TileKind};
use crate::statvar::{SpecOverrides, StatVarProvider};
use crate::tile::{
    resolve_tile_latest, shared_event_fetch, RequestGeneration, SharedEventData, TileContext,
    TileRequest, TileResult, TileType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Result cap per query unless all results are requested.
pub const QUERY_MAX_RESULTS: usize = 3;
const RELATED_QUESTIONS_MAX: usize = 6;
const EXPLORE_URL_ROOT: &str = "https://datacommons.org/explore#q=";
const FETCH_ERROR_MSG: &str = "Error fetching data.";

/// How restrictive the allowed chart set is for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    #[default]
    Default,
    Strict,
}

impl QueryMode {
    /// Parses the `mode` query parameter; anything but `strict` is the
    /// default mode.
    pub fn parse(mode: &str) -> Self {
        if mode.eq_ignore_ascii_case("strict") {
            QueryMode::Strict
        } else {
            QueryMode::Default
        }
    }
}

/// Per-query options from the caller.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Ignore [`QUERY_MAX_RESULTS`] and resolve every tile.
    pub all_results: bool,
    /// Consumer identifier; restricted consumers get a reduced chart
    /// type allow-list.
    pub client: String,
    pub mode: QueryMode,
}

/// The tile types a consumer is allowed to receive. Unlisted types are
/// silently skipped, never errored.
pub fn allowed_tile_types(client: &str, mode: QueryMode) -> HashSet<TileType> {
    if mode == QueryMode::Strict || client.eq_ignore_ascii_case("toolformer") {
        return HashSet::from([TileType::Line, TileType::Highlight]);
    }
    HashSet::from([
        TileType::Line,
        TileType::Bar,
        TileType::Ranking,
        TileType::Scatter,
    ])
}

/// Elapsed-time breakdown for one query, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDebug {
    pub detection_secs: f64,
    pub tile_secs: f64,
    pub total_secs: f64,
}

/// The query endpoint's response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub charts: Vec<TileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<QueryDebug>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_questions: Vec<String>,
    /// Deep link to the explorer UI for the original query.
    pub dc_url: String,
}

/// Drives detection and tile fan-out for one query at a time.
pub struct QueryOrchestrator {
    nl: Arc<dyn NlApi>,
    ctx: TileContext,
}

impl QueryOrchestrator {
    pub fn new(nl: Arc<dyn NlApi>, ctx: TileContext) -> Self {
        Self { nl, ctx }
    }

    pub async fn run_query(&self, query: &str, opts: &QueryOptions) -> QueryResult {
        let started = Instant::now();
        let dc_url = format!("{}{}", EXPLORE_URL_ROOT, urlencoding::encode(query));

        let detection = match self.nl.detect_and_fulfill(query).await {
            Ok(detection) => detection,
            Err(err) => {
                error!(%err, "NL detection failed");
                return QueryResult {
                    err: Some(FETCH_ERROR_MSG.to_string()),
                    dc_url,
                    ..Default::default()
                };
            }
        };
        let detected_at = Instant::now();

        // No resolved place is a defined empty result, not an error.
        if !detection.has_place() {
            debug!(query, "no place detected");
            return QueryResult {
                debug: Some(timings(started, detected_at, Instant::now())),
                dc_url,
                ..Default::default()
            };
        }
        let Some(config) = &detection.config else {
            return QueryResult {
                debug: Some(timings(started, detected_at, Instant::now())),
                dc_url,
                ..Default::default()
            };
        };

        let place = PlaceSpec::new(
            &detection.place.dcid,
            &detection.place.name,
            &[detection.place.place_type.as_str()],
        );
        let requests = self.build_requests(config, &place, &detection.place.place_type, opts);
        info!(query, tiles = requests.len(), "dispatching tiles");

        let mut tasks: JoinSet<(usize, Vec<TileResult>)> = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let ctx = self.ctx.clone();
            // Each tile position gets its own generation slot; a
            // resolution superseded by a newer one for the same slot
            // yields nothing.
            let slot = Arc::new(RequestGeneration::new());
            tasks.spawn(async move {
                let results = resolve_tile_latest(&ctx, &request, &slot)
                    .await
                    .unwrap_or_default();
                (index, results)
            });
        }
        // Re-ordered by original tile position, not completion order.
        let mut slots: Vec<Vec<TileResult>> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, results)) => {
                    if slots.len() <= index {
                        slots.resize_with(index + 1, Vec::new);
                    }
                    slots[index] = results;
                }
                Err(err) => {
                    error!(%err, "tile task panicked");
                    return QueryResult {
                        err: Some(FETCH_ERROR_MSG.to_string()),
                        dc_url,
                        ..Default::default()
                    };
                }
            }
        }
        let charts: Vec<TileResult> = slots.into_iter().flatten().collect();

        QueryResult {
            charts,
            err: None,
            debug: Some(timings(started, detected_at, Instant::now())),
            related_questions: related_questions(&detection.related_things),
            dc_url,
        }
    }

    /// Walks categories, blocks, columns and tiles in order, resolving
    /// specs and setting up block-shared event fetches.
    fn build_requests(
        &self,
        config: &PageConfig,
        place: &PlaceSpec,
        place_type: &str,
        opts: &QueryOptions,
    ) -> Vec<TileRequest> {
        let allowed = allowed_tile_types(&opts.client, opts.mode);
        let enclosed_place_type = config.metadata.contained_place_types.get(place_type).cloned();
        let mut requests = Vec::new();
        'categories: for category in &config.categories {
            let provider = StatVarProvider::new(category.stat_var_spec.clone());
            for block in &category.blocks {
                if !opts.all_results && requests.len() >= QUERY_MAX_RESULTS {
                    break 'categories;
                }
                // Strict consumers get deterministic values: snap every
                // spec to the highest-coverage date.
                let block_date = (opts.mode == QueryMode::Strict)
                    .then(|| crate::statvar::HIGHEST_COVERAGE_DATE.to_string());
                let overrides = SpecOverrides {
                    block_denom: block.block_denom().to_string(),
                    block_date,
                    ..Default::default()
                };
                let shared_events = self.block_event_fetch(config, block, place);
                for column in &block.columns {
                    for tile in &column.tiles {
                        if !opts.all_results && requests.len() >= QUERY_MAX_RESULTS {
                            break;
                        }
                        let tile_type = tile.kind.tile_type();
                        if !allowed.contains(&tile_type) {
                            debug!(tile = %tile.title, kind = %tile_type, "tile type not allowed, skipping");
                            continue;
                        }
                        let event_key = event_type_key(&tile.kind);
                        let specs = provider.resolve_list(&tile.stat_var_key, &overrides);
                        if specs.is_empty() && event_key.is_none() {
                            debug!(tile = %tile.title, "no resolvable stat vars, skipping");
                            continue;
                        }
                        let event_spec = event_key
                            .and_then(|key| config.metadata.event_type_spec.get(key).cloned());
                        requests.push(TileRequest {
                            tile: tile.clone(),
                            place: place.clone(),
                            enclosed_place_type: enclosed_place_type.clone(),
                            specs,
                            event_spec,
                            event_data: shared_events.clone(),
                        });
                    }
                }
            }
        }
        requests
    }

    /// For a disaster block, starts the one event fetch every tile in
    /// the block shares.
    fn block_event_fetch(
        &self,
        config: &PageConfig,
        block: &Block,
        place: &PlaceSpec,
    ) -> Option<SharedEventData> {
        if block.block_type != BlockType::DisasterEvent {
            return None;
        }
        let mut dcids: Vec<String> = Vec::new();
        for column in &block.columns {
            for tile in &column.tiles {
                let Some(key) = event_type_key(&tile.kind) else {
                    continue;
                };
                let Some(spec) = config.metadata.event_type_spec.get(key) else {
                    continue;
                };
                for dcid in &spec.event_type_dcids {
                    if !dcids.contains(dcid) {
                        dcids.push(dcid.clone());
                    }
                }
            }
        }
        if dcids.is_empty() {
            return None;
        }
        Some(shared_event_fetch(
            self.ctx.api.clone(),
            dcids,
            place.dcid.clone(),
            String::new(),
        ))
    }
}

/// The event type spec key a tile references, if it is a disaster tile.
fn event_type_key(kind: &TileKind) -> Option<&str> {
    match kind {
        TileKind::DisasterEventMap(spec) => spec.event_type_keys.first().map(|k| k.as_str()),
        TileKind::TopEvent(spec) => Some(&spec.event_type_key),
        _ => None,
    }
}

fn timings(started: Instant, detected_at: Instant, finished: Instant) -> QueryDebug {
    QueryDebug {
        detection_secs: (detected_at - started).as_secs_f64(),
        tile_secs: (finished - detected_at).as_secs_f64(),
        total_secs: (finished - started).as_secs_f64(),
    }
}

/// Up to six follow-up questions, alternating child and peer topics.
fn related_questions(related: &RelatedThings) -> Vec<String> {
    let mut questions = Vec::new();
    let mut child = related.child_topics.iter();
    let mut peer = related.peer_topics.iter();
    while questions.len() < RELATED_QUESTIONS_MAX {
        match (child.next(), peer.next()) {
            (None, None) => break,
            (child_topic, peer_topic) => {
                if let Some(topic) = child_topic {
                    questions.push(topic.clone());
                }
                if let Some(topic) = peer_topic {
                    if questions.len() < RELATED_QUESTIONS_MAX {
                        questions.push(topic.clone());
                    }
                }
            }
        }
    }
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::UnitOverrideConfig;
    use crate::config::{
        Block, Category, Column, PageMetadata, TileConfig,
    };
    use crate::observation::{
        FacetMetadata, MockObservationApi, Observation, PointResponse,
    };
    use crate::statvar::StatVarSpec;
    use nl::tests::MockNlApi;
    use std::collections::HashMap;

    fn detection(config: PageConfig) -> NlResponse {
        NlResponse {
            place: NlPlace {
                dcid: "geoId/06".to_string(),
                name: "California".to_string(),
                place_type: "State".to_string(),
            },
            config: Some(config),
            related_things: RelatedThings::default(),
        }
    }

    fn bar_tile(title: &str) -> TileConfig {
        TileConfig {
            title: title.to_string(),
            stat_var_key: vec!["count_person".to_string()],
            kind: TileKind::Bar(Default::default()),
            ..Default::default()
        }
    }

    fn page_config(tiles: Vec<TileConfig>) -> PageConfig {
        let mut stat_var_spec = HashMap::new();
        stat_var_spec.insert(
            "count_person".to_string(),
            StatVarSpec::for_stat_var("Count_Person"),
        );
        PageConfig {
            metadata: PageMetadata::default(),
            categories: vec![Category {
                title: "Demographics".to_string(),
                stat_var_spec,
                blocks: vec![Block {
                    columns: vec![Column { tiles }],
                    ..Default::default()
                }],
            }],
        }
    }

    fn observation_api() -> MockObservationApi {
        let mut resp = PointResponse::default();
        resp.data.entry("Count_Person".to_string()).or_default().insert(
            "geoId/06".to_string(),
            Observation {
                date: "2021".to_string(),
                value: Some(39000000.0),
                facet: "f1".to_string(),
            },
        );
        resp.facets.insert(
            "f1".to_string(),
            FacetMetadata {
                provenance_url: "census.gov".to_string(),
                ..Default::default()
            },
        );
        MockObservationApi {
            point: Ok(resp),
            ..Default::default()
        }
    }

    fn orchestrator(nl: MockNlApi, api: MockObservationApi) -> QueryOrchestrator {
        let ctx = TileContext {
            api: Arc::new(api),
            api_root: "https://datacommons.org".to_string(),
            url_root: "https://example.org".to_string(),
            api_key: String::new(),
            renderer: None,
            unit_overrides: UnitOverrideConfig::default(),
        };
        QueryOrchestrator::new(Arc::new(nl), ctx)
    }

    #[tokio::test]
    async fn test_run_query_resolves_tiles_in_order() {
        let nl = MockNlApi {
            response: Some(detection(page_config(vec![
                bar_tile("first"),
                bar_tile("second"),
            ]))),
            ..Default::default()
        };
        let result = orchestrator(nl, observation_api())
            .run_query("population of california", &QueryOptions::default())
            .await;
        assert!(result.err.is_none());
        assert_eq!(result.charts.len(), 2);
        assert_eq!(result.charts[0].title, "first");
        assert_eq!(result.charts[1].title, "second");
        let debug = result.debug.unwrap();
        assert!(debug.total_secs >= debug.detection_secs);
        assert_eq!(
            result.dc_url,
            "https://datacommons.org/explore#q=population%20of%20california"
        );
    }

    #[tokio::test]
    async fn test_result_cap_unless_all_results() {
        let tiles: Vec<TileConfig> = (0..5).map(|i| bar_tile(&format!("tile {}", i))).collect();
        let nl = MockNlApi {
            response: Some(detection(page_config(tiles.clone()))),
            ..Default::default()
        };
        let capped = orchestrator(nl.clone(), observation_api())
            .run_query("q", &QueryOptions::default())
            .await;
        assert_eq!(capped.charts.len(), QUERY_MAX_RESULTS);

        let all = orchestrator(nl, observation_api())
            .run_query(
                "q",
                &QueryOptions {
                    all_results: true,
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(all.charts.len(), 5);
    }

    #[tokio::test]
    async fn test_no_place_is_a_defined_empty_result() {
        let nl = MockNlApi::default();
        let result = orchestrator(nl, MockObservationApi::default())
            .run_query("gibberish", &QueryOptions::default())
            .await;
        assert!(result.charts.is_empty());
        assert!(result.err.is_none());
        assert!(result.debug.is_some());
    }

    #[tokio::test]
    async fn test_nl_failure_is_query_fatal() {
        let nl = MockNlApi {
            error: Some("service unreachable".to_string()),
            ..Default::default()
        };
        let result = orchestrator(nl, MockObservationApi::default())
            .run_query("q", &QueryOptions::default())
            .await;
        assert_eq!(result.err.as_deref(), Some("Error fetching data."));
        assert!(result.charts.is_empty());
    }

    #[tokio::test]
    async fn test_disallowed_tile_types_are_skipped_silently() {
        let mut highlight = bar_tile("headline");
        highlight.kind = TileKind::Highlight;
        let nl = MockNlApi {
            response: Some(detection(page_config(vec![
                highlight,
                bar_tile("allowed"),
            ]))),
            ..Default::default()
        };
        let result = orchestrator(nl, observation_api())
            .run_query("q", &QueryOptions::default())
            .await;
        assert_eq!(result.charts.len(), 1);
        assert_eq!(result.charts[0].title, "allowed");
    }

    #[test]
    fn test_allow_list_by_mode_and_client() {
        let default = allowed_tile_types("bard", QueryMode::Default);
        assert!(default.contains(&TileType::Bar));
        assert!(default.contains(&TileType::Ranking));
        assert!(!default.contains(&TileType::Highlight));

        let strict = allowed_tile_types("bard", QueryMode::Strict);
        assert_eq!(
            strict,
            HashSet::from([TileType::Line, TileType::Highlight])
        );
        // A restricted client gets the strict set regardless of mode.
        let toolformer = allowed_tile_types("toolformer", QueryMode::Default);
        assert_eq!(toolformer, strict);
    }

    #[test]
    fn test_related_questions_alternate_and_cap() {
        let related = RelatedThings {
            child_topics: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            peer_topics: vec!["x".into(), "y".into(), "z".into(), "w".into()],
        };
        let questions = related_questions(&related);
        assert_eq!(questions, vec!["a", "x", "b", "y", "c", "z"]);

        let short = RelatedThings {
            child_topics: vec!["a".into()],
            peer_topics: vec![],
        };
        assert_eq!(related_questions(&short), vec!["a"]);
    }

    #[test]
    fn test_query_mode_parse() {
        assert_eq!(QueryMode::parse("strict"), QueryMode::Strict);
        assert_eq!(QueryMode::parse("STRICT"), QueryMode::Strict);
        assert_eq!(QueryMode::parse(""), QueryMode::Default);
        assert_eq!(QueryMode::parse("default"), QueryMode::Default);
    }
}

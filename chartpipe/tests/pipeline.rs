//! End-to-end pipeline tests against fixture clients.

use chartpipe::chart::UnitOverrideConfig;
use chartpipe::codec::{decode_chart_props, encode_chart_props, ChartProps};
use chartpipe::config::{
    Block, Category, Column, PageConfig, PageMetadata, TileConfig, TileKind,
};
use chartpipe::observation::{
    EventApiResponse, FacetMetadata, Observation, ObservationApi, ObservationError, PointResponse,
    SeriesResponse,
};
use chartpipe::query::{
    NlApi, NlError, NlPlace, NlResponse, QueryOptions, QueryOrchestrator, RelatedThings,
};
use chartpipe::statvar::StatVarSpec;
use chartpipe::tile::TileContext;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// Observation client that fails any request mentioning a poisoned
/// variable and serves canned point data otherwise.
struct FixtureApi {
    points: PointResponse,
    poisoned_var: Option<String>,
}

impl FixtureApi {
    fn poisoned(&self, variables: &[String]) -> bool {
        match &self.poisoned_var {
            Some(var) => variables.contains(var),
            None => false,
        }
    }
}

impl ObservationApi for FixtureApi {
    fn get_point<'a>(
        &'a self,
        _entities: &'a [String],
        variables: &'a [String],
        _date: &'a str,
    ) -> BoxFuture<'a, Result<PointResponse, ObservationError>> {
        let result = if self.poisoned(variables) {
            Err(ObservationError::Http("connection reset".to_string()))
        } else {
            Ok(self.points.clone())
        };
        Box::pin(std::future::ready(result))
    }

    fn get_point_within<'a>(
        &'a self,
        _parent_entity: &'a str,
        _child_type: &'a str,
        variables: &'a [String],
        date: &'a str,
    ) -> BoxFuture<'a, Result<PointResponse, ObservationError>> {
        self.get_point(&[], variables, date)
    }

    fn get_series<'a>(
        &'a self,
        _entities: &'a [String],
        _variables: &'a [String],
    ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>> {
        Box::pin(std::future::ready(Ok(SeriesResponse::default())))
    }

    fn get_series_within<'a>(
        &'a self,
        _parent_entity: &'a str,
        _child_type: &'a str,
        _variables: &'a [String],
    ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>> {
        Box::pin(std::future::ready(Ok(SeriesResponse::default())))
    }

    fn get_place_names<'a>(
        &'a self,
        dcids: &'a [String],
    ) -> BoxFuture<'a, Result<HashMap<String, String>, ObservationError>> {
        let names = dcids.iter().map(|d| (d.clone(), d.clone())).collect();
        Box::pin(std::future::ready(Ok(names)))
    }

    fn get_event_data<'a>(
        &'a self,
        _event_type_dcids: &'a [String],
        _place: &'a str,
        _date: &'a str,
    ) -> BoxFuture<'a, Result<EventApiResponse, ObservationError>> {
        Box::pin(std::future::ready(Ok(EventApiResponse::default())))
    }
}

struct FixtureNl {
    response: NlResponse,
}

impl NlApi for FixtureNl {
    fn detect_and_fulfill<'a>(
        &'a self,
        _query: &'a str,
    ) -> BoxFuture<'a, Result<NlResponse, NlError>> {
        Box::pin(std::future::ready(Ok(self.response.clone())))
    }
}

fn point_data(entries: &[(&str, f64)]) -> PointResponse {
    let mut resp = PointResponse::default();
    for (var, value) in entries {
        resp.data.entry(var.to_string()).or_default().insert(
            "geoId/06".to_string(),
            Observation {
                date: "2021".to_string(),
                value: Some(*value),
                facet: "f1".to_string(),
            },
        );
    }
    resp.facets.insert(
        "f1".to_string(),
        FacetMetadata {
            provenance_url: "census.gov".to_string(),
            ..Default::default()
        },
    );
    resp
}

fn bar_tile(title: &str, key: &str) -> TileConfig {
    TileConfig {
        title: title.to_string(),
        stat_var_key: vec![key.to_string()],
        kind: TileKind::Bar(Default::default()),
        ..Default::default()
    }
}

fn page_config(tiles: Vec<TileConfig>, specs: &[(&str, &str)]) -> PageConfig {
    let mut stat_var_spec = HashMap::new();
    for (key, var) in specs {
        stat_var_spec.insert(key.to_string(), StatVarSpec::for_stat_var(var));
    }
    PageConfig {
        metadata: PageMetadata::default(),
        categories: vec![Category {
            title: "Test".to_string(),
            stat_var_spec,
            blocks: vec![Block {
                columns: vec![Column { tiles }],
                ..Default::default()
            }],
        }],
    }
}

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

fn context(api: FixtureApi) -> TileContext {
    TileContext {
        api: Arc::new(api),
        api_root: "https://datacommons.org".to_string(),
        url_root: "https://example.org".to_string(),
        api_key: String::new(),
        renderer: None,
        unit_overrides: UnitOverrideConfig::default(),
    }
}

#[tokio::test]
async fn partial_failure_keeps_sibling_tiles_in_order() {
    let config = page_config(
        vec![
            bar_tile("first", "good_a"),
            bar_tile("second", "bad"),
            bar_tile("third", "good_b"),
        ],
        &[
            ("good_a", "Count_Person"),
            ("bad", "Broken_Var"),
            ("good_b", "Count_Household"),
        ],
    );
    let api = FixtureApi {
        points: point_data(&[("Count_Person", 39000000.0), ("Count_Household", 13000000.0)]),
        poisoned_var: Some("Broken_Var".to_string()),
    };
    let orchestrator = QueryOrchestrator::new(
        Arc::new(FixtureNl {
            response: detection(config),
        }),
        context(api),
    );
    let result = orchestrator.run_query("test", &QueryOptions::default()).await;

    // Tile #2's rejection is isolated; #1 and #3 survive in order.
    assert!(result.err.is_none());
    assert_eq!(result.charts.len(), 2);
    assert_eq!(result.charts[0].title, "first");
    assert_eq!(result.charts[1].title, "third");
}

#[tokio::test]
async fn chart_url_token_round_trips_through_the_codec() {
    let config = page_config(
        vec![bar_tile("chart", "key")],
        &[("key", "Count_Person")],
    );
    let api = FixtureApi {
        points: point_data(&[("Count_Person", 39000000.0)]),
        poisoned_var: None,
    };
    let orchestrator = QueryOrchestrator::new(
        Arc::new(FixtureNl {
            response: detection(config),
        }),
        context(api),
    );
    let result = orchestrator.run_query("test", &QueryOptions::default()).await;
    assert_eq!(result.charts.len(), 1);

    // The emitted chart URL token decodes back to self-contained props.
    let chartpipe::tile::TileArtifact::ChartUrl(url) = &result.charts[0].artifact else {
        panic!("expected a chart URL artifact");
    };
    let token = url.split("config=").nth(1).unwrap();
    let props = decode_chart_props(token).unwrap();
    assert_eq!(props.place, "geoId/06");
    assert_eq!(props.stat_var_spec[0].stat_var, "Count_Person");
    assert!(props.tile_config.stat_var_key.is_empty());
}

#[test]
fn codec_round_trips_deeply_nested_props() {
    let props = ChartProps {
        place: "country/USA".to_string(),
        enclosed_place_type: Some("State".to_string()),
        stat_var_spec: vec![
            StatVarSpec {
                denom: Some("Count_Person".to_string()),
                unit: Some("%".to_string()),
                scaling: Some(100.0),
                name: Some("Unemployment rate".to_string()),
                ..StatVarSpec::for_stat_var("Count_Unemployed")
            },
            StatVarSpec::for_stat_var("Count_Person"),
        ],
        tile_config: TileConfig {
            title: "Unemployment in ${placeName}".to_string(),
            description: "A chart".to_string(),
            stat_var_key: Vec::new(),
            kind: TileKind::Ranking(chartpipe::config::RankingTileSpec {
                show_highest: true,
                show_lowest: true,
                ranking_count: 10,
                ..Default::default()
            }),
        },
        event_type_spec: None,
    };
    let decoded = decode_chart_props(&encode_chart_props(&props).unwrap()).unwrap();
    assert_eq!(decoded, props);
}

#[test]
fn empty_props_round_trip() {
    let props = ChartProps::default();
    let decoded = decode_chart_props(&encode_chart_props(&props).unwrap()).unwrap();
    assert_eq!(decoded, props);
}

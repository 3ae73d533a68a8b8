//! HTTP surface: the stateless chart endpoint and the query endpoint.

use crate::codec::decode_chart_props;
use crate::config::{PlaceSpec, TileKind};
use crate::query::{QueryMode, QueryOptions, QueryOrchestrator};
use crate::tile::{resolve_tile, shared_event_fetch, TileContext, TileRequest};
use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: TileContext,
    pub orchestrator: Arc<QueryOrchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/nodejs/chart", get(chart_handler))
        .route("/nodejs/query", post(query_handler))
        .with_state(state)
}

/// Binds and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(state)).await
}

#[derive(Deserialize)]
struct ChartParams {
    config: String,
}

/// Regenerates one chart from its encoded configuration alone.
///
/// Two processes given the same `config` value produce the same chart
/// data, modulo upstream changes; no session state is consulted.
async fn chart_handler(
    State(state): State<AppState>,
    Query(params): Query<ChartParams>,
) -> Response {
    let props = match decode_chart_props(&params.config) {
        Ok(props) => props,
        Err(err) => {
            warn!(%err, "chart link decode failed");
            return (StatusCode::BAD_REQUEST, "invalid chart link").into_response();
        }
    };

    // The codec carries the place dcid only; resolve its display name.
    let dcids = vec![props.place.clone()];
    let place_name = match state.ctx.api.get_place_names(&dcids).await {
        Ok(names) => names.get(&props.place).cloned().unwrap_or_else(|| props.place.clone()),
        Err(_) => props.place.clone(),
    };
    let place = PlaceSpec::new(&props.place, &place_name, &[]);

    let event_data = props.event_spec_dcids().map(|dcids| {
        shared_event_fetch(
            state.ctx.api.clone(),
            dcids,
            props.place.clone(),
            String::new(),
        )
    });
    let request = TileRequest {
        tile: props.tile_config.clone(),
        place,
        enclosed_place_type: props.enclosed_place_type.clone(),
        specs: Arc::new(props.stat_var_spec.clone()),
        event_spec: props.event_type_spec.clone(),
        event_data,
    };
    let results = resolve_tile(&state.ctx, &request).await;
    match results.into_iter().next() {
        Some(result) => Json(result).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "err": "Error fetching data." })),
        )
            .into_response(),
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct QueryParams {
    client: String,
    mode: String,
    #[serde(rename = "allResults")]
    all_results: bool,
}

#[derive(Deserialize)]
struct QueryBody {
    q: String,
}

async fn query_handler(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    Json(body): Json<QueryBody>,
) -> Response {
    let opts = QueryOptions {
        all_results: params.all_results,
        client: params.client,
        mode: QueryMode::parse(&params.mode),
    };
    let result = state.orchestrator.run_query(&body.q, &opts).await;
    Json(result).into_response()
}

trait ChartPropsExt {
    /// Event type dcids when this chart needs an event fetch.
    fn event_spec_dcids(&self) -> Option<Vec<String>>;
}

impl ChartPropsExt for crate::codec::ChartProps {
    fn event_spec_dcids(&self) -> Option<Vec<String>> {
        if !matches!(
            self.tile_config.kind,
            TileKind::DisasterEventMap(_) | TileKind::TopEvent(_)
        ) {
            return None;
        }
        self.event_type_spec
            .as_ref()
            .map(|spec| spec.event_type_dcids.clone())
            .filter(|dcids| !dcids.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::UnitOverrideConfig;
    use crate::codec::{encode_chart_props, ChartProps};
    use crate::config::TileConfig;
    use crate::observation::{
        FacetMetadata, MockObservationApi, Observation, PointResponse,
    };
    use crate::query::MockNlApi;
    use crate::statvar::StatVarSpec;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(api: MockObservationApi) -> AppState {
        let ctx = TileContext {
            api: Arc::new(api),
            api_root: "https://datacommons.org".to_string(),
            url_root: "https://example.org".to_string(),
            api_key: String::new(),
            renderer: None,
            unit_overrides: UnitOverrideConfig::default(),
        };
        AppState {
            orchestrator: Arc::new(QueryOrchestrator::new(
                Arc::new(MockNlApi::default()),
                ctx.clone(),
            )),
            ctx,
        }
    }

    #[tokio::test]
    async fn test_malformed_chart_link_is_a_400() {
        let app = router(state(MockObservationApi::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nodejs/chart?config=%21%21garbage%21%21")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chart_endpoint_round_trips_a_bar_tile() {
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
        let props = ChartProps {
            place: "geoId/06".to_string(),
            enclosed_place_type: None,
            stat_var_spec: vec![StatVarSpec::for_stat_var("Count_Person")],
            tile_config: TileConfig {
                title: "Population".to_string(),
                kind: TileKind::Bar(Default::default()),
                ..Default::default()
            },
            event_type_spec: None,
        };
        let token = encode_chart_props(&props).unwrap();
        let app = router(state(MockObservationApi {
            point: Ok(resp),
            ..Default::default()
        }));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/nodejs/chart?config={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "BAR");
        assert!(json["data_csv"].is_string());
        assert!(json.get("chartUrl").is_some());
    }

    #[tokio::test]
    async fn test_query_endpoint_empty_place_contract() {
        let app = router(state(MockObservationApi::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/nodejs/query?client=bard")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"q": "population of nowhere"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["charts"], serde_json::json!([]));
        assert!(json.get("err").is_none());
    }
}

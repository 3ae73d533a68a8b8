//! Line tile: time series for one place or for children of a parent.

use super::{build_result, fetch_series, TileContext, TileError, TileRequest, TileResult};
use crate::chart::{data_groups_to_csv, normalize_series, NormalizePolicy};

pub(super) async fn build(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let policy = NormalizePolicy {
        unit_overrides: ctx.unit_overrides.clone(),
        ..Default::default()
    };
    let fetched = fetch_series(ctx, req).await?;
    let chart = normalize_series(
        &req.specs,
        &fetched.series,
        fetched.denom.as_ref(),
        &fetched.entities,
        &fetched.place_names,
        &policy,
    );
    let legend: Vec<String> = chart.data_groups.iter().map(|g| g.label.clone()).collect();
    let csv = data_groups_to_csv(&chart.data_groups);
    let result = build_result(ctx, req, &chart, Some(csv), Some(legend)).await?;
    Ok(vec![result])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::UnitOverrideConfig;
    use crate::config::{PlaceSpec, TileConfig, TileKind};
    use crate::observation::{
        FacetMetadata, MockObservationApi, Observation, Series, SeriesResponse,
    };
    use crate::statvar::StatVarSpec;
    use std::sync::Arc;

    fn series_response() -> SeriesResponse {
        let mut resp = SeriesResponse::default();
        resp.data.entry("Count_Person".to_string()).or_default().insert(
            "geoId/06".to_string(),
            Series {
                series: vec![
                    Observation {
                        date: "2020".to_string(),
                        value: Some(39500000.0),
                        facet: "f1".to_string(),
                    },
                    Observation {
                        date: "2021".to_string(),
                        value: Some(39000000.0),
                        facet: "f1".to_string(),
                    },
                ],
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
        resp
    }

    #[tokio::test]
    async fn test_line_tile_builds_dated_rows() {
        let api = MockObservationApi {
            series: Ok(series_response()),
            ..Default::default()
        };
        let ctx = TileContext {
            api: Arc::new(api),
            api_root: "https://datacommons.org".to_string(),
            url_root: "https://example.org".to_string(),
            api_key: String::new(),
            renderer: None,
            unit_overrides: UnitOverrideConfig::default(),
        };
        let req = TileRequest {
            tile: TileConfig {
                title: "Population over time".to_string(),
                kind: TileKind::Line,
                ..Default::default()
            },
            place: PlaceSpec::new("geoId/06", "California", &["State"]),
            enclosed_place_type: None,
            specs: Arc::new(vec![StatVarSpec::for_stat_var("Count_Person")]),
            event_spec: None,
            event_data: None,
        };
        let results = build(&ctx, &req).await.unwrap();
        assert_eq!(results.len(), 1);
        let csv = results[0].data_csv.as_deref().unwrap();
        assert!(csv.starts_with("label,Count_Person"));
        assert!(csv.contains("2020,39500000"));
        assert!(csv.contains("2021,39000000"));
    }
}

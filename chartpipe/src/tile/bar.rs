//! Bar-family tiles: bar, donut, gauge and histogram.
//!
//! All four share the same point fetch and normalization; they differ
//! only in sort/truncation policy and, for gauge, a value highlight.

use super::{build_result, fetch_point, TileContext, TileError, TileRequest, TileResult};
use crate::chart::{data_groups_to_csv, normalize_point, NormalizePolicy};
use crate::config::TileKind;
use crate::tile::Highlight;

pub(super) async fn build(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let mut policy = NormalizePolicy {
        unit_overrides: ctx.unit_overrides.clone(),
        ..Default::default()
    };
    match &req.tile.kind {
        TileKind::Bar(spec) => {
            policy.sort = spec.sort;
            if let Some(max_places) = spec.max_places {
                policy.max_places = max_places;
            }
            policy.max_variables = spec.max_variables;
        }
        TileKind::Donut(spec) => {
            policy.max_variables = spec.max_variables;
        }
        TileKind::Gauge(_) | TileKind::Histogram => {}
        other => {
            return Err(TileError::Config(format!(
                "bar builder invoked for {}",
                other.tile_type()
            )))
        }
    }

    let fetched = fetch_point(ctx, req, policy.sort).await?;
    let chart = normalize_point(
        &req.specs,
        &fetched.point,
        fetched.denom.as_ref(),
        &fetched.ranked,
        &fetched.place_names,
        &policy,
        &ctx.api_root,
    );

    let legend: Vec<String> = chart.data_groups.iter().map(|g| g.label.clone()).collect();
    let csv = data_groups_to_csv(&chart.data_groups);
    let mut result = build_result(ctx, req, &chart, Some(csv), Some(legend)).await?;
    if matches!(req.tile.kind, TileKind::Gauge(_)) {
        // Gauges show a single needle value.
        result.highlight = chart
            .data_groups
            .first()
            .and_then(|group| group.points.first())
            .map(|point| Highlight {
                value: point.value,
                date: point.date.clone().unwrap_or_default(),
            });
    }
    Ok(vec![result])
}

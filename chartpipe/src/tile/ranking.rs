//! Ranking tile: top/bottom place lists, single or multi column.
//!
//! One tile config legitimately produces several results (one per
//! highest/lowest unit per variable); the orchestrator flattens them.

use super::{build_result, fetch_point, TileContext, TileError, TileRequest, TileResult};
use crate::chart::{
    date_range, ranking_points, ranking_points_to_csv, ranking_table_to_csv, ChartData,
    NormalizePolicy, RankingPoint,
};
use crate::config::{RankingTileSpec, TileKind};
use crate::statvar::StatVarSpec;
use std::collections::{BTreeSet, HashMap};

pub(super) async fn build(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let TileKind::Ranking(spec) = &req.tile.kind else {
        return Err(TileError::Config(
            "ranking builder invoked for a non-ranking tile".to_string(),
        ));
    };
    if req.enclosed_place_type.is_none() {
        return Err(TileError::Config(
            "ranking tile requires an enclosed place type".to_string(),
        ));
    }
    let policy = NormalizePolicy {
        max_places: usize::MAX,
        unit_overrides: ctx.unit_overrides.clone(),
        ..Default::default()
    };
    let fetched = fetch_point(ctx, req, None).await?;

    let mut sources: BTreeSet<String> = BTreeSet::new();
    let per_variable: Vec<Vec<RankingPoint>> = req
        .specs
        .iter()
        .map(|sv_spec| {
            ranking_points(
                sv_spec,
                &fetched.point,
                fetched.denom.as_ref(),
                &fetched.ranked,
                &fetched.place_names,
                &policy,
                &mut sources,
            )
        })
        .collect();
    let dates: BTreeSet<String> = per_variable
        .iter()
        .flatten()
        .filter_map(|p| p.date.clone())
        .collect();
    let chart = ChartData {
        data_groups: Vec::new(),
        sources,
        unit: String::new(),
        date_range: date_range(dates.iter().map(|d| d.as_str())),
        error_msg: String::new(),
        place_name: String::new(),
    };

    let mut results = Vec::new();
    if spec.show_multi_column {
        results.push(multi_column_result(ctx, req, spec, &chart, &per_variable).await?);
        return Ok(results);
    }
    for (sv_spec, points) in req.specs.iter().zip(&per_variable) {
        // Separate stable sorts per direction; ties keep entity order
        // in both views.
        let mut ascending = points.clone();
        ascending.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut descending = points.clone();
        descending.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let count = spec.count().min(ascending.len());
        if spec.show_highest_lowest {
            let mut combined: Vec<RankingPoint> =
                descending.iter().take(count).cloned().collect();
            combined.extend(ascending.iter().take(count).cloned());
            let mut seen: BTreeSet<String> = BTreeSet::new();
            combined.retain(|p| seen.insert(p.place_dcid.clone()));
            results.push(unit_result(ctx, req, sv_spec, &chart, &combined).await?);
            continue;
        }
        if spec.show_highest {
            let highest: Vec<RankingPoint> = descending.iter().take(count).cloned().collect();
            results.push(unit_result(ctx, req, sv_spec, &chart, &highest).await?);
        }
        if spec.show_lowest {
            let lowest: Vec<RankingPoint> = ascending.iter().take(count).cloned().collect();
            results.push(unit_result(ctx, req, sv_spec, &chart, &lowest).await?);
        }
    }
    Ok(results)
}

async fn unit_result(
    ctx: &TileContext,
    req: &TileRequest,
    sv_spec: &StatVarSpec,
    chart: &ChartData,
    points: &[RankingPoint],
) -> Result<TileResult, TileError> {
    let csv = ranking_points_to_csv(points, sv_spec.display_name());
    let mut result = build_result(ctx, req, chart, Some(csv), None).await?;
    result.vars = vec![sv_spec.stat_var.clone()];
    Ok(result)
}

async fn multi_column_result(
    ctx: &TileContext,
    req: &TileRequest,
    spec: &RankingTileSpec,
    chart: &ChartData,
    per_variable: &[Vec<RankingPoint>],
) -> Result<TileResult, TileError> {
    // Row order follows the first variable, descending.
    let mut order: Vec<RankingPoint> = per_variable.first().cloned().unwrap_or_default();
    order.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(spec.count());
    let names: Vec<&str> = req.specs.iter().map(|s| s.display_name()).collect();
    let values: Vec<HashMap<String, f64>> = per_variable
        .iter()
        .map(|points| {
            points
                .iter()
                .filter_map(|p| p.value.map(|v| (p.place_dcid.clone(), v)))
                .collect()
        })
        .collect();
    let csv = ranking_table_to_csv(&order, &names, &values);
    build_result(ctx, req, chart, Some(csv), None).await
}

//! Map tile: one variable across all children of a place.

use super::{build_result, fetch_point, TileContext, TileError, TileRequest, TileResult};
use crate::chart::{
    data_groups_to_csv, date_range, ranking_points, ChartData, DataGroup, DataPoint,
    NormalizePolicy,
};
use std::collections::BTreeSet;

pub(super) async fn build(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let Some(spec) = req.specs.first() else {
        return Err(TileError::Config(
            "map tile requires a variable".to_string(),
        ));
    };
    if req.enclosed_place_type.is_none() {
        return Err(TileError::Config(
            "map tile requires an enclosed place type".to_string(),
        ));
    }
    // Choropleths show every child place; no truncation.
    let policy = NormalizePolicy {
        max_places: usize::MAX,
        unit_overrides: ctx.unit_overrides.clone(),
        ..Default::default()
    };
    let fetched = fetch_point(ctx, req, None).await?;

    let mut sources: BTreeSet<String> = BTreeSet::new();
    let points = ranking_points(
        spec,
        &fetched.point,
        fetched.denom.as_ref(),
        &fetched.ranked,
        &fetched.place_names,
        &policy,
        &mut sources,
    );
    let dates: BTreeSet<String> = points.iter().filter_map(|p| p.date.clone()).collect();
    let data_points: Vec<DataPoint> = points
        .iter()
        .filter_map(|p| {
            p.value.map(|value| DataPoint {
                label: p.label().to_string(),
                value,
                date: p.date.clone(),
                dcid: Some(p.place_dcid.clone()),
            })
        })
        .collect();
    let group = DataGroup {
        label: spec.display_name().to_string(),
        points: data_points,
        link: None,
    };
    let chart = ChartData {
        data_groups: vec![group],
        sources,
        unit: String::new(),
        date_range: date_range(dates.iter().map(|d| d.as_str())),
        error_msg: String::new(),
        place_name: String::new(),
    };
    let csv = data_groups_to_csv(&chart.data_groups);
    let result = build_result(ctx, req, &chart, Some(csv), None).await?;
    Ok(vec![result])
}

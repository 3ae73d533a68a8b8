//! Scatter tile: two variables paired per child place.

use super::{build_result, fetch_point, TileContext, TileError, TileRequest, TileResult};
use crate::chart::{
    date_range, ranking_points, scatter_points_to_csv, ChartData, NormalizePolicy, ScatterPoint,
};
use std::collections::BTreeSet;

pub(super) async fn build(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    if req.specs.len() != 2 {
        return Err(TileError::Config(format!(
            "scatter tile requires exactly 2 variables, got {}",
            req.specs.len()
        )));
    }
    if req.enclosed_place_type.is_none() {
        return Err(TileError::Config(
            "scatter tile requires an enclosed place type".to_string(),
        ));
    }
    let policy = NormalizePolicy {
        max_places: usize::MAX,
        unit_overrides: ctx.unit_overrides.clone(),
        ..Default::default()
    };
    let fetched = fetch_point(ctx, req, None).await?;

    let mut sources: BTreeSet<String> = BTreeSet::new();
    let x_points = ranking_points(
        &req.specs[0],
        &fetched.point,
        fetched.denom.as_ref(),
        &fetched.ranked,
        &fetched.place_names,
        &policy,
        &mut sources,
    );
    let y_points = ranking_points(
        &req.specs[1],
        &fetched.point,
        fetched.denom.as_ref(),
        &fetched.ranked,
        &fetched.place_names,
        &policy,
        &mut sources,
    );

    // Pair places present on both axes; unpaired places are dropped.
    let mut points: Vec<ScatterPoint> = Vec::new();
    let mut dates: BTreeSet<String> = BTreeSet::new();
    for x in &x_points {
        let Some(y) = y_points.iter().find(|p| p.place_dcid == x.place_dcid) else {
            continue;
        };
        let (Some(x_value), Some(y_value)) = (x.value, y.value) else {
            continue;
        };
        let x_date = x.date.clone().unwrap_or_default();
        let y_date = y.date.clone().unwrap_or_default();
        dates.insert(x_date.clone());
        dates.insert(y_date.clone());
        points.push(ScatterPoint {
            place_dcid: x.place_dcid.clone(),
            place_name: x.place_name.clone().unwrap_or_else(|| x.place_dcid.clone()),
            x_value,
            x_date,
            y_value,
            y_date,
        });
    }

    let chart = ChartData {
        data_groups: Vec::new(),
        sources,
        unit: String::new(),
        date_range: date_range(dates.iter().map(|d| d.as_str())),
        error_msg: String::new(),
        place_name: String::new(),
    };
    let csv = scatter_points_to_csv(&points);
    let result = build_result(ctx, req, &chart, Some(csv), None).await?;
    Ok(vec![result])
}

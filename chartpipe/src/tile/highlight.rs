//! Highlight tile: a single headline value for one place.

use super::{
    chart_props, fetch_point, format_title, Highlight, SourceAttribution, TileArtifact,
    TileContext, TileError, TileRequest, TileResult,
};
use crate::chart::{normalize_point, NormalizePolicy};
use crate::codec::chart_url;

/// Highlights have no drawable surface; they always carry a stateless
/// chart URL even when a renderer is configured.
pub(super) async fn build(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let policy = NormalizePolicy {
        unit_overrides: ctx.unit_overrides.clone(),
        ..Default::default()
    };
    let fetched = fetch_point(ctx, req, None).await?;
    let chart = normalize_point(
        &req.specs,
        &fetched.point,
        fetched.denom.as_ref(),
        &fetched.ranked,
        &fetched.place_names,
        &policy,
        &ctx.api_root,
    );
    let highlight = chart
        .data_groups
        .first()
        .and_then(|group| group.points.first())
        .map(|point| Highlight {
            value: point.value,
            date: point.date.clone().unwrap_or_default(),
        });

    let title = format_title(&req.tile.title, &req.place.name, &chart.date_range);
    let artifact = TileArtifact::ChartUrl(chart_url(&ctx.url_root, &ctx.api_key, &chart_props(req))?);
    let mut result = TileResult::new(req.tile.kind.tile_type(), &title, artifact);
    result.srcs = chart
        .sources
        .iter()
        .map(|url| SourceAttribution::from_url(url))
        .collect();
    result.vars = req.specs.iter().map(|s| s.stat_var.clone()).collect();
    result.places = vec![req.place.dcid.clone()];
    if !chart.unit.is_empty() {
        result.unit = Some(chart.unit.clone());
    }
    result.highlight = highlight;
    Ok(vec![result])
}

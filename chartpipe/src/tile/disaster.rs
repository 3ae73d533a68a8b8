//! Disaster event tiles: event map and top-event ranking.
//!
//! Every tile in a disaster block shares one event data fetch. The
//! orchestrator creates the shared future per block and hands a clone
//! to each tile, so N tiles issue exactly one upstream request.

use super::{
    chart_props, format_title, SourceAttribution, TileArtifact, TileContext, TileError,
    TileRequest, TileResult,
};
use crate::codec::chart_url;
use crate::config::{SeverityFilter, TileKind};
use crate::observation::{DisasterEvent, EventApiResponse, ObservationApi};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A clonable, awaitable handle to one block-level event data fetch.
pub type SharedEventData = Shared<BoxFuture<'static, Result<Arc<EventApiResponse>, String>>>;

/// Starts the block-level event fetch. The returned handle can be
/// awaited by any number of tiles; the request runs once.
pub fn shared_event_fetch(
    api: Arc<dyn ObservationApi>,
    event_type_dcids: Vec<String>,
    place: String,
    date: String,
) -> SharedEventData {
    let fut: BoxFuture<'static, Result<Arc<EventApiResponse>, String>> = Box::pin(async move {
        api.get_event_data(&event_type_dcids, &place, &date)
            .await
            .map(Arc::new)
            .map_err(|err| err.to_string())
    });
    fut.shared()
}

async fn event_data(req: &TileRequest) -> Result<Arc<EventApiResponse>, TileError> {
    let shared = req
        .event_data
        .clone()
        .ok_or_else(|| TileError::Config("disaster tile without event data fetch".to_string()))?;
    shared.await.map_err(TileError::Event)
}

/// Events of the tile's event types, severity-filtered when the spec
/// carries a filter.
fn relevant_events<'a>(
    data: &'a EventApiResponse,
    event_type_dcids: &[String],
    filter: Option<&SeverityFilter>,
) -> Vec<&'a DisasterEvent> {
    data.events
        .iter()
        .filter(|event| event_type_dcids.contains(&event.event_type))
        .filter(|event| match filter {
            Some(filter) => match event.severity.get(&filter.prop) {
                Some(value) => {
                    filter.lower_limit.map(|lo| *value >= lo).unwrap_or(true)
                        && filter.upper_limit.map(|hi| *value <= hi).unwrap_or(true)
                }
                None => false,
            },
            None => true,
        })
        .collect()
}

fn event_sources(data: &EventApiResponse, events: &[&DisasterEvent]) -> Vec<SourceAttribution> {
    let urls: BTreeSet<&str> = events
        .iter()
        .filter_map(|event| data.provenance_info.get(&event.provenance_id))
        .map(|prov| prov.provenance_url.as_str())
        .filter(|url| !url.is_empty())
        .collect();
    urls.into_iter().map(SourceAttribution::from_url).collect()
}

fn base_result(
    ctx: &TileContext,
    req: &TileRequest,
    srcs: Vec<SourceAttribution>,
    data_csv: String,
) -> Result<TileResult, TileError> {
    let title = format_title(&req.tile.title, &req.place.name, "");
    let artifact = TileArtifact::ChartUrl(chart_url(&ctx.url_root, &ctx.api_key, &chart_props(req))?);
    let mut result = TileResult::new(req.tile.kind.tile_type(), &title, artifact);
    result.srcs = srcs;
    result.places = vec![req.place.dcid.clone()];
    result.place_type = req.enclosed_place_type.clone();
    result.vars = req
        .event_spec
        .iter()
        .flat_map(|spec| spec.event_type_dcids.clone())
        .collect();
    result.data_csv = Some(data_csv);
    Ok(result)
}

/// Disaster event map: all matching events with their locations.
pub(super) async fn build_map(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let event_spec = req
        .event_spec
        .as_ref()
        .ok_or_else(|| TileError::Config("disaster map without an event type spec".to_string()))?;
    let data = event_data(req).await?;
    let events = relevant_events(
        &data,
        &event_spec.event_type_dcids,
        event_spec.default_severity_filter.as_ref(),
    );

    let mut lines = vec!["eventName,eventDcid,startDate".to_string()];
    for event in &events {
        lines.push(format!("{},{},{}", event.name, event.dcid, event.start_date));
    }
    let srcs = event_sources(&data, &events);
    let result = base_result(ctx, req, srcs, lines.join("\r\n"))?;
    Ok(vec![result])
}

/// Top-event tile: events ranked by their severity property.
pub(super) async fn build_top_event(
    ctx: &TileContext,
    req: &TileRequest,
) -> Result<Vec<TileResult>, TileError> {
    let TileKind::TopEvent(tile_spec) = &req.tile.kind else {
        return Err(TileError::Config(
            "top-event builder invoked for a different tile kind".to_string(),
        ));
    };
    let event_spec = req
        .event_spec
        .as_ref()
        .ok_or_else(|| TileError::Config("top-event tile without an event type spec".to_string()))?;
    let filter = event_spec.default_severity_filter.as_ref().ok_or_else(|| {
        TileError::Config("top-event tile requires a severity filter to rank by".to_string())
    })?;
    let data = event_data(req).await?;
    let mut events = relevant_events(&data, &event_spec.event_type_dcids, Some(filter));
    events.sort_by(|a, b| {
        let a = a.severity.get(&filter.prop).copied().unwrap_or(0.0);
        let b = b.severity.get(&filter.prop).copied().unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    events.truncate(tile_spec.count());

    let mut lines = vec![format!("rank,eventName,startDate,{}", filter.prop)];
    for (idx, event) in events.iter().enumerate() {
        let severity = event.severity.get(&filter.prop).copied().unwrap_or(0.0);
        lines.push(format!(
            "{},{},{},{}",
            idx + 1,
            event.name,
            event.start_date,
            severity
        ));
    }
    let srcs = event_sources(&data, &events);
    let result = base_result(ctx, req, srcs, lines.join("\r\n"))?;
    Ok(vec![result])
}

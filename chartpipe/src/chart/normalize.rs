//! Conversion of raw observation responses into [`ChartData`].

use super::data::{ChartData, DataGroup, DataPoint, RankingPoint};
use super::date::date_range;
use super::unit::{stat_format, UnitOverrideConfig};
use crate::config::SortOrder;
use crate::observation::{PointResponse, SeriesResponse, FILTER_STAT_VAR};
use crate::statvar::StatVarSpec;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const DEFAULT_MAX_PLACES: usize = 7;

/// Sorting, truncation and unit policy for one normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizePolicy {
    pub sort: Option<SortOrder>,
    pub max_places: usize,
    pub max_variables: Option<usize>,
    pub unit_overrides: UnitOverrideConfig,
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        Self {
            sort: None,
            max_places: DEFAULT_MAX_PLACES,
            max_variables: None,
            unit_overrides: UnitOverrideConfig::default(),
        }
    }
}

/// Canned empty-state message, parameterized by the requested
/// variables.
pub fn no_data_error_msg(specs: &[StatVarSpec]) -> String {
    let names: Vec<&str> = specs.iter().map(|spec| spec.display_name()).collect();
    format!("No data available for {}.", names.join(", "))
}

/// Orders the entities of a point response by population.
///
/// Entities without a `Count_Person` value (non-place entities such as
/// enumerated codes) fall back to an unordered set derived from
/// whichever response data is present. Population sorts are stable, so
/// ties retain response order; value sorts are handled later by
/// [`normalize_point`].
pub fn rank_entities(resp: &PointResponse, sort: Option<SortOrder>) -> Vec<RankingPoint> {
    let mut points: Vec<RankingPoint> = Vec::new();
    let pop_data = match resp.data.get(FILTER_STAT_VAR) {
        Some(data) if !data.is_empty() => data,
        _ => {
            let mut entities: BTreeSet<&String> = BTreeSet::new();
            for entity_obs in resp.data.values() {
                entities.extend(entity_obs.keys());
            }
            for entity in entities {
                points.push(RankingPoint {
                    place_dcid: entity.clone(),
                    ..Default::default()
                });
            }
            return points;
        }
    };
    // Deterministic base order before the stable population sort.
    let mut entities: Vec<(&String, f64)> = pop_data
        .iter()
        .filter_map(|(entity, obs)| obs.value.map(|v| (entity, v)))
        .collect();
    entities.sort_by(|a, b| a.0.cmp(b.0));
    match sort {
        Some(SortOrder::AscendingPopulation) => {
            entities.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        }
        None | Some(SortOrder::DescendingPopulation) => {
            entities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        }
        _ => {}
    }
    for (entity, value) in entities {
        points.push(RankingPoint {
            place_dcid: entity.clone(),
            value: Some(value),
            ..Default::default()
        });
    }
    points
}

/// Computes one data point's value, applying per-capita division,
/// scaling and facet unit overrides.
///
/// Returns `None` when the point must be dropped (missing or unusable
/// denominator); the caller must not zero-fill.
#[allow(clippy::too_many_arguments)]
fn processed_value(
    spec: &StatVarSpec,
    raw_value: f64,
    date: &str,
    facet_id: &str,
    entity: &str,
    point: &PointResponse,
    denom: Option<&SeriesResponse>,
    policy: &NormalizePolicy,
    sources: &mut BTreeSet<String>,
) -> Option<(f64, String)> {
    let mut value = raw_value;
    if let Some(facet) = point.facets.get(facet_id) {
        if !facet.provenance_url.is_empty() {
            sources.insert(facet.provenance_url.clone());
        }
    }
    if let Some(denom_var) = &spec.denom {
        let denom_resp = denom?;
        let series = denom_resp.series(denom_var, entity);
        let denom_obs = series.and_then(|s| s.value_at(date));
        let denom_value = denom_obs.and_then(|obs| obs.value).unwrap_or(0.0);
        if denom_value == 0.0 {
            debug!(
                entity = entity,
                date = date,
                denom = %denom_var,
                "dropping point with missing denominator"
            );
            return None;
        }
        value /= denom_value;
        if let Some(series) = series {
            if let Some(facet) = denom_resp.facets.get(&series.facet) {
                if !facet.provenance_url.is_empty() {
                    sources.insert(facet.provenance_url.clone());
                }
            }
        }
    }
    let format = stat_format(spec, &point.facets, facet_id, &policy.unit_overrides);
    Some((value * format.scaling, format.unit))
}

/// Normalizes a point response into grouped chart data, one group per
/// entity in ranked order.
///
/// Points for a stat var absent from the response are skipped, never
/// zero-filled. When zero groups survive, `error_msg` carries the
/// no-data message and nothing else signals emptiness.
pub fn normalize_point(
    specs: &[StatVarSpec],
    point: &PointResponse,
    denom: Option<&SeriesResponse>,
    entity_order: &[RankingPoint],
    place_names: &HashMap<String, String>,
    policy: &NormalizePolicy,
    api_root: &str,
) -> ChartData {
    let mut sources: BTreeSet<String> = BTreeSet::new();
    let mut dates: BTreeSet<String> = BTreeSet::new();
    let mut data_groups: Vec<DataGroup> = Vec::new();

    // Unit label from the first spec's facet; a facet override seen on
    // any retained point wins over it.
    let mut unit = specs
        .first()
        .and_then(|spec| {
            entity_order.iter().find_map(|entity| {
                point
                    .observation(&spec.stat_var, &entity.place_dcid)
                    .map(|obs| stat_format(spec, &point.facets, &obs.facet, &policy.unit_overrides).unit)
            })
        })
        .unwrap_or_default();

    let api_root = api_root.trim_end_matches('/');
    for entity in entity_order {
        let dcid = &entity.place_dcid;
        let mut points: Vec<DataPoint> = Vec::new();
        for spec in specs {
            let Some(obs) = point.observation(&spec.stat_var, dcid) else {
                continue;
            };
            let Some(raw_value) = obs.value else {
                continue;
            };
            let Some((value, point_unit)) = processed_value(
                spec,
                raw_value,
                &obs.date,
                &obs.facet,
                dcid,
                point,
                denom,
                policy,
                &mut sources,
            ) else {
                continue;
            };
            if policy
                .unit_overrides
                .get(
                    point
                        .facets
                        .get(&obs.facet)
                        .and_then(|f| f.unit.as_deref())
                        .unwrap_or_default(),
                )
                .is_some()
            {
                unit = point_unit;
            }
            dates.insert(obs.date.clone());
            points.push(DataPoint {
                label: spec.display_name().to_string(),
                value,
                date: Some(obs.date.clone()),
                dcid: Some(dcid.clone()),
            });
        }
        if !points.is_empty() {
            let label = place_names.get(dcid).cloned().unwrap_or_else(|| dcid.clone());
            data_groups.push(DataGroup {
                label,
                points,
                link: Some(format!("{}/place/{}", api_root, dcid)),
            });
        }
    }

    apply_value_sort(&mut data_groups, specs.len(), policy.sort);

    if let Some(max_variables) = policy.max_variables {
        for group in &mut data_groups {
            group.points.truncate(max_variables);
        }
    }
    data_groups.truncate(policy.max_places);

    let error_msg = if data_groups.is_empty() {
        no_data_error_msg(specs)
    } else {
        String::new()
    };

    ChartData {
        date_range: date_range(dates.iter().map(|d| d.as_str())),
        data_groups,
        sources,
        unit,
        error_msg,
        place_name: String::new(),
    }
}

/// Value-order sorting: with a single variable the groups themselves
/// are ordered; with several, the first group's points are ordered and
/// the other groups mirror that label order.
fn apply_value_sort(data_groups: &mut [DataGroup], num_variables: usize, sort: Option<SortOrder>) {
    let direction = match sort {
        Some(SortOrder::Ascending) => 1.0,
        Some(SortOrder::Descending) => -1.0,
        _ => return,
    };
    if num_variables == 1 {
        data_groups.sort_by(|a, b| {
            let (Some(a), Some(b)) = (a.points.first(), b.points.first()) else {
                return std::cmp::Ordering::Equal;
            };
            (a.value * direction)
                .partial_cmp(&(b.value * direction))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    } else if let Some((first, rest)) = data_groups.split_first_mut() {
        first.points.sort_by(|a, b| {
            (a.value * direction)
                .partial_cmp(&(b.value * direction))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let order: Vec<String> = first.points.iter().map(|p| p.label.clone()).collect();
        for group in rest {
            group.points.sort_by_key(|p| {
                order
                    .iter()
                    .position(|label| label == &p.label)
                    .unwrap_or(usize::MAX)
            });
        }
    }
}

/// Builds processed ranking points for one variable, in entity order.
///
/// Values go through the same per-capita, scaling and override path as
/// grouped chart data; entities without a usable value are skipped.
/// Facet sources are accumulated into `sources`.
pub fn ranking_points(
    spec: &StatVarSpec,
    point: &PointResponse,
    denom: Option<&SeriesResponse>,
    entity_order: &[RankingPoint],
    place_names: &HashMap<String, String>,
    policy: &NormalizePolicy,
    sources: &mut BTreeSet<String>,
) -> Vec<RankingPoint> {
    let mut points = Vec::new();
    for entity in entity_order {
        let dcid = &entity.place_dcid;
        let Some(obs) = point.observation(&spec.stat_var, dcid) else {
            continue;
        };
        let Some(raw_value) = obs.value else {
            continue;
        };
        let Some((value, _)) = processed_value(
            spec, raw_value, &obs.date, &obs.facet, dcid, point, denom, policy, sources,
        ) else {
            continue;
        };
        points.push(RankingPoint {
            place_dcid: dcid.clone(),
            place_name: place_names.get(dcid).cloned(),
            value: Some(value),
            date: Some(obs.date.clone()),
        });
    }
    points
}

/// Normalizes a series response into chart data for time series tiles:
/// one group per variable, or one per place when several places share a
/// single variable.
pub fn normalize_series(
    specs: &[StatVarSpec],
    series_resp: &SeriesResponse,
    denom: Option<&SeriesResponse>,
    entities: &[String],
    place_names: &HashMap<String, String>,
    policy: &NormalizePolicy,
) -> ChartData {
    let mut sources: BTreeSet<String> = BTreeSet::new();
    let mut dates: BTreeSet<String> = BTreeSet::new();
    let mut data_groups: Vec<DataGroup> = Vec::new();
    let group_by_place = entities.len() > 1 && specs.len() == 1;
    let mut unit = String::new();

    for spec in specs {
        for entity in entities {
            let Some(series) = series_resp.series(&spec.stat_var, entity) else {
                continue;
            };
            if let Some(facet) = series_resp.facets.get(&series.facet) {
                if !facet.provenance_url.is_empty() {
                    sources.insert(facet.provenance_url.clone());
                }
            }
            let format = stat_format(
                spec,
                &series_resp.facets,
                &series.facet,
                &policy.unit_overrides,
            );
            if unit.is_empty() {
                unit = format.unit.clone();
            }
            let mut points: Vec<DataPoint> = Vec::new();
            for obs in &series.series {
                let Some(raw_value) = obs.value else {
                    continue;
                };
                let mut value = raw_value;
                if let Some(denom_var) = &spec.denom {
                    let denom_pair =
                        denom.and_then(|d| d.series(denom_var, entity).map(|s| (d, s)));
                    let denom_value = denom_pair
                        .and_then(|(_, s)| s.value_at(&obs.date))
                        .and_then(|o| o.value)
                        .unwrap_or(0.0);
                    if denom_value == 0.0 {
                        debug!(
                            entity = %entity,
                            date = %obs.date,
                            denom = %denom_var,
                            "dropping point with missing denominator"
                        );
                        continue;
                    }
                    value /= denom_value;
                    if let Some((resp, s)) = denom_pair {
                        if let Some(facet) = resp.facets.get(&s.facet) {
                            if !facet.provenance_url.is_empty() {
                                sources.insert(facet.provenance_url.clone());
                            }
                        }
                    }
                }
                value *= format.scaling;
                dates.insert(obs.date.clone());
                points.push(DataPoint {
                    label: obs.date.clone(),
                    value,
                    date: Some(obs.date.clone()),
                    dcid: Some(entity.clone()),
                });
            }
            if points.is_empty() {
                continue;
            }
            let label = if group_by_place {
                place_names.get(entity).cloned().unwrap_or_else(|| entity.clone())
            } else {
                spec.display_name().to_string()
            };
            data_groups.push(DataGroup {
                label,
                points,
                link: None,
            });
        }
    }

    let error_msg = if data_groups.is_empty() {
        no_data_error_msg(specs)
    } else {
        String::new()
    };

    ChartData {
        date_range: date_range(dates.iter().map(|d| d.as_str())),
        data_groups,
        sources,
        unit,
        error_msg,
        place_name: String::new(),
    }
}

//! Unit alignment for point responses.
//!
//! Observations for one variable can come from facets with different
//! units. Before normalization, each group of aligned variables is
//! filtered down to its single best unit so that values are comparable
//! across entities.

use super::types::{FacetMetadata, Observation, PointResponse};
use std::collections::{HashMap, HashSet};

const EMPTY_UNIT: &str = "EMPTY";

/// Picks the most common unit, breaking count ties by lexical order.
fn best_unit(unit_counts: &HashMap<String, usize>) -> String {
    let mut ranked: Vec<&String> = unit_counts.keys().collect();
    ranked.sort_by(|a, b| {
        unit_counts[*b]
            .cmp(&unit_counts[*a])
            .then_with(|| a.cmp(b))
    });
    ranked
        .first()
        .map(|u| u.to_string())
        .unwrap_or_else(|| EMPTY_UNIT.to_string())
}

fn observation_unit(facets: &HashMap<String, FacetMetadata>, obs: &Observation) -> String {
    if let Some(facet) = facets.get(&obs.facet) {
        if let Some(unit) = facet.unit.as_deref().or(facet.unit_display_name.as_deref()) {
            return unit.to_string();
        }
    }
    EMPTY_UNIT.to_string()
}

/// Returns a point response where every variable in an aligned group
/// only keeps observations in the group's best unit, and every other
/// variable keeps observations in its own best unit.
pub fn align_point_units(resp: PointResponse, aligned_variables: &[Vec<String>]) -> PointResponse {
    let mut groups: Vec<Vec<String>> = aligned_variables.to_vec();
    let grouped: HashSet<&String> = aligned_variables.iter().flatten().collect();
    for stat_var in resp.data.keys() {
        if !grouped.contains(stat_var) {
            groups.push(vec![stat_var.clone()]);
        }
    }

    let mut data: HashMap<String, HashMap<String, Observation>> = HashMap::new();
    for group in &groups {
        let mut unit_counts: HashMap<String, usize> = HashMap::new();
        for stat_var in group {
            let Some(entity_obs) = resp.data.get(stat_var) else {
                continue;
            };
            for obs in entity_obs.values() {
                if obs.is_empty() {
                    continue;
                }
                *unit_counts
                    .entry(observation_unit(&resp.facets, obs))
                    .or_default() += 1;
            }
        }
        let chosen = best_unit(&unit_counts);
        for stat_var in group {
            let Some(entity_obs) = resp.data.get(stat_var) else {
                continue;
            };
            let kept: HashMap<String, Observation> = entity_obs
                .iter()
                .filter(|(_, obs)| observation_unit(&resp.facets, obs) == chosen)
                .map(|(entity, obs)| (entity.clone(), obs.clone()))
                .collect();
            data.insert(stat_var.clone(), kept);
        }
    }

    PointResponse {
        data,
        facets: resp.facets,
    }
}

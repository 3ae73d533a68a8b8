//! Resolver from symbolic stat var keys to concrete specs.

use super::spec::StatVarSpec;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Block-level overrides applied during resolution.
///
/// An override never mutates the provider's map; resolution copies the
/// spec and replaces fields on the copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecOverrides {
    /// Replaces the spec's denominator when non-empty.
    pub block_denom: String,
    /// Replaces the spec's date when set; usually the
    /// [`HIGHEST_COVERAGE_DATE`](super::HIGHEST_COVERAGE_DATE) sentinel.
    pub block_date: Option<String>,
    /// Per stat var facet overrides; wins over the spec-carried facet.
    pub facet_overrides: HashMap<String, String>,
}

/// Resolves symbolic keys from a category's spec map into concrete
/// [`StatVarSpec`] values.
///
/// Resolution is a pure function of the map and the overrides, so list
/// resolutions are memoized by a structural hash of their inputs. The
/// memoized `Arc` keeps the returned list referentially stable across
/// re-invocations with identical inputs, which lets callers skip
/// redundant downstream fetches.
pub struct StatVarProvider {
    specs: HashMap<String, StatVarSpec>,
    cache: DashMap<u64, Arc<Vec<StatVarSpec>>>,
}

impl StatVarProvider {
    pub fn new(specs: HashMap<String, StatVarSpec>) -> Self {
        Self {
            specs,
            cache: DashMap::new(),
        }
    }

    /// Resolves a single key, applying overrides.
    ///
    /// Returns `None` when the key is absent from the spec map.
    pub fn resolve(&self, key: &str, overrides: &SpecOverrides) -> Option<StatVarSpec> {
        let mut spec = self.specs.get(key)?.clone();
        if !overrides.block_denom.is_empty() {
            spec.denom = Some(overrides.block_denom.clone());
        }
        if let Some(date) = &overrides.block_date {
            spec.date = Some(date.clone());
        }
        if let Some(facet_id) = overrides.facet_overrides.get(&spec.stat_var) {
            spec.facet_id = Some(facet_id.clone());
        }
        Some(spec)
    }

    /// Resolves a list of keys, dropping unresolvable ones.
    ///
    /// The result may be shorter than the input; callers must tolerate
    /// that. Results are memoized per `{keys, overrides}`.
    pub fn resolve_list(&self, keys: &[String], overrides: &SpecOverrides) -> Arc<Vec<StatVarSpec>> {
        let cache_key = list_cache_key(keys, overrides);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Arc::clone(&cached);
        }
        let resolved: Vec<StatVarSpec> = keys
            .iter()
            .filter_map(|key| self.resolve(key, overrides))
            .collect();
        let resolved = Arc::new(resolved);
        self.cache.insert(cache_key, Arc::clone(&resolved));
        resolved
    }
}

/// Structural hash over every input that affects `resolve_list`.
///
/// The facet override map is folded in sorted order so that two maps
/// with the same entries always hash identically.
fn list_cache_key(keys: &[String], overrides: &SpecOverrides) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    keys.hash(&mut hasher);
    overrides.block_denom.hash(&mut hasher);
    overrides.block_date.hash(&mut hasher);
    let sorted: BTreeMap<&String, &String> = overrides.facet_overrides.iter().collect();
    for (stat_var, facet_id) in sorted {
        stat_var.hash(&mut hasher);
        facet_id.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> StatVarProvider {
        let mut specs = HashMap::new();
        specs.insert(
            "count_person".to_string(),
            StatVarSpec::for_stat_var("Count_Person"),
        );
        specs.insert(
            "median_income".to_string(),
            StatVarSpec {
                facet_id: Some("f1".to_string()),
                ..StatVarSpec::for_stat_var("Median_Income_Person")
            },
        );
        StatVarProvider::new(specs)
    }

    #[test]
    fn test_resolve_unknown_key_is_none() {
        assert!(provider()
            .resolve("not_a_key", &SpecOverrides::default())
            .is_none());
    }

    #[test]
    fn test_resolve_applies_block_denom() {
        let overrides = SpecOverrides {
            block_denom: "Count_Person".to_string(),
            ..Default::default()
        };
        let spec = provider().resolve("median_income", &overrides).unwrap();
        assert_eq!(spec.denom.as_deref(), Some("Count_Person"));
    }

    #[test]
    fn test_resolve_does_not_mutate_map() {
        let p = provider();
        let overrides = SpecOverrides {
            block_denom: "Count_Person".to_string(),
            ..Default::default()
        };
        p.resolve("count_person", &overrides).unwrap();
        let unmodified = p.resolve("count_person", &SpecOverrides::default()).unwrap();
        assert!(unmodified.denom.is_none());
    }

    #[test]
    fn test_facet_override_wins_over_spec_facet() {
        let mut facet_overrides = HashMap::new();
        facet_overrides.insert("Median_Income_Person".to_string(), "f9".to_string());
        let overrides = SpecOverrides {
            facet_overrides,
            ..Default::default()
        };
        let spec = provider().resolve("median_income", &overrides).unwrap();
        assert_eq!(spec.facet_id.as_deref(), Some("f9"));
    }

    #[test]
    fn test_resolve_list_drops_unresolvable() {
        let keys = vec![
            "count_person".to_string(),
            "missing".to_string(),
            "median_income".to_string(),
        ];
        let resolved = provider().resolve_list(&keys, &SpecOverrides::default());
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].stat_var, "Count_Person");
    }

    #[test]
    fn test_resolve_list_is_referentially_stable() {
        let p = provider();
        let keys = vec!["count_person".to_string()];
        let first = p.resolve_list(&keys, &SpecOverrides::default());
        let second = p.resolve_list(&keys, &SpecOverrides::default());
        assert!(Arc::ptr_eq(&first, &second));

        // A different override must miss the cache.
        let overrides = SpecOverrides {
            block_denom: "Count_Person".to_string(),
            ..Default::default()
        };
        let third = p.resolve_list(&keys, &overrides);
        assert!(!Arc::ptr_eq(&first, &third));
    }
}

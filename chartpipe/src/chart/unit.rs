//! Unit resolution and facet unit overrides.

use crate::observation::FacetMetadata;
use crate::statvar::StatVarSpec;
use std::collections::HashMap;

/// Replacement display unit and multiplier for a facet unit string.
///
/// Some facets encode a magnitude in their unit (e.g. `"SDG_CU_USD_M"`
/// meaning millions of current US dollars); an override rescales the
/// value and replaces the displayed unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOverride {
    pub unit: String,
    pub multiplier: f64,
    pub unit_display_name: Option<String>,
}

/// Overrides keyed by facet unit string.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOverrideConfig {
    overrides: HashMap<String, UnitOverride>,
}

impl Default for UnitOverrideConfig {
    fn default() -> Self {
        let mut overrides = HashMap::new();
        overrides.insert(
            "SDG_CU_USD_M".to_string(),
            UnitOverride {
                unit: "USD".to_string(),
                multiplier: 1_000_000.0,
                unit_display_name: Some("USD".to_string()),
            },
        );
        overrides.insert(
            "SDG_CU_USD_B".to_string(),
            UnitOverride {
                unit: "USD".to_string(),
                multiplier: 1_000_000_000.0,
                unit_display_name: Some("USD".to_string()),
            },
        );
        Self { overrides }
    }
}

impl UnitOverrideConfig {
    pub fn empty() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn get(&self, facet_unit: &str) -> Option<&UnitOverride> {
        self.overrides.get(facet_unit)
    }
}

/// Resolved display unit and value multiplier for one data point.
#[derive(Debug, Clone, PartialEq)]
pub struct StatFormat {
    pub unit: String,
    pub scaling: f64,
}

/// Resolves unit and scaling for a spec against the facet an
/// observation came from.
///
/// Precedence: a facet unit override wins for both the unit label and
/// the multiplier, and the multiplier composes with the spec's own
/// scaling. Without an override, the spec's unit wins over the facet's
/// display unit.
pub fn stat_format(
    spec: &StatVarSpec,
    facets: &HashMap<String, FacetMetadata>,
    facet_id: &str,
    overrides: &UnitOverrideConfig,
) -> StatFormat {
    let mut unit = spec.unit.clone().unwrap_or_default();
    let mut scaling = spec.scaling.unwrap_or(1.0);
    if let Some(facet) = facets.get(facet_id) {
        let facet_unit = facet.unit.clone().unwrap_or_default();
        if let Some(ov) = overrides.get(&facet_unit) {
            unit = ov
                .unit_display_name
                .clone()
                .unwrap_or_else(|| ov.unit.clone());
            scaling *= ov.multiplier;
        } else if unit.is_empty() {
            unit = facet
                .unit_display_name
                .clone()
                .or_else(|| facet.unit.clone())
                .unwrap_or_default();
        }
    }
    StatFormat { unit, scaling }
}

//! FeatureProfileBuilder: sparse query vector for similarity scoring
//!
//! Writes a handful of keys from [`features`] into a sparse map. Each rule
//! writes a disjoint key, so rule order does not matter. Keys the builder
//! does not write are implicitly 0 when projected into the matrix schema.

use crate::pipeline::environment::EnvironmentalContext;
use crate::utils::{normalize_ph, normalize_rainfall};
use rustc_hash::FxHashMap;

/// Feature column names shared with the reference trait matrix
pub mod features {
    pub const NATIVE_REGION_COUNT: &str = "native_region_count";
    pub const GROWTH_PH_MINIMUM: &str = "growth_ph_minimum";
    pub const GROWTH_PH_MAXIMUM: &str = "growth_ph_maximum";
    pub const GROWTH_MIN_PRECIPITATION: &str = "growth_minimum_precipitation_mm";
    pub const HABIT_GRAMINOID: &str = "habit_Graminoid";
    pub const HABIT_SHRUB: &str = "habit_Shrub";

    /// Every key the builder may write
    pub const ALL: [&str; 6] = [
        NATIVE_REGION_COUNT,
        GROWTH_PH_MINIMUM,
        GROWTH_PH_MAXIMUM,
        GROWTH_MIN_PRECIPITATION,
        HABIT_GRAMINOID,
        HABIT_SHRUB,
    ];
}

/// Sparse feature name → value in [0, 1]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicFeatureProfile {
    values: FxHashMap<&'static str, f64>,
}

impl DynamicFeatureProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: &'static str, value: f64) {
        self.values.insert(feature, value);
    }

    /// Value for a feature, 0.0 when unset
    pub fn get(&self, feature: &str) -> f64 {
        self.values.get(feature).copied().unwrap_or(0.0)
    }

    pub fn is_set(&self, feature: &str) -> bool {
        self.values.contains_key(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build the dynamic profile for one request
///
/// The growth-habit indicator follows the caller's biome override string
/// only; a derived biome never sets it.
pub fn build(
    context: &EnvironmentalContext,
    is_urban: bool,
    biome_override: Option<&str>,
) -> DynamicFeatureProfile {
    let mut profile = DynamicFeatureProfile::new();

    profile.set(features::NATIVE_REGION_COUNT, if is_urban { 1.0 } else { 0.5 });

    // Point tolerance: min and max pH share the same value
    let norm_ph = normalize_ph(context.soil_ph);
    profile.set(features::GROWTH_PH_MINIMUM, norm_ph);
    profile.set(features::GROWTH_PH_MAXIMUM, norm_ph);

    profile.set(features::GROWTH_MIN_PRECIPITATION, normalize_rainfall(context.rainfall_mm));

    match biome_override.map(str::trim) {
        Some("Grassland") => profile.set(features::HABIT_GRAMINOID, 1.0),
        Some("Forest") => profile.set(features::HABIT_SHRUB, 1.0),
        _ => {}
    }

    profile
}

//! Risk-analysis pipeline
//!
//! Each stage lives in its own module:
//! - `geo_matcher`: nearby occurrences + canonical name lookup
//! - `environment`: biome classification and soil pH
//! - `feature_profile`: sparse query vector
//! - `similarity`: cosine scan over the reference matrix
//! - `result_composer`: labels, nearby flags, ordering, metadata
//!
//! [`run_pipeline`] is the synchronous tail once climate and occurrence
//! data are in hand; it only reads the shared matrix.

pub mod environment;
pub mod feature_profile;
pub mod geo_matcher;
pub mod result_composer;
pub mod similarity;

pub use environment::{derive_biome, profile, soil_ph, Biome, BiomeSource, ClimateReading, EnvironmentalContext};
pub use feature_profile::{build as build_profile, features, DynamicFeatureProfile};
pub use geo_matcher::{find_nearby, haversine_km, NearbyLookup, NearbyOccurrence};
pub use result_composer::{compose, RiskLabel, RiskResult, ScanMeta, ScanReport};
pub use similarity::{cosine_similarity, score, ScoredRow, TOP_N};

use crate::data::ReferenceMatrix;

/// Profile → score → compose for one request
pub fn run_pipeline(
    matrix: &ReferenceMatrix,
    context: &EnvironmentalContext,
    nearby: &NearbyLookup,
    is_urban: bool,
    biome_override: Option<&str>,
) -> ScanReport {
    let dynamic_profile = feature_profile::build(context, is_urban, biome_override);
    let scored = similarity::score(matrix, &dynamic_profile);

    tracing::debug!(
        "Scored {} reference species against {} profile features ({} kept)",
        matrix.len(),
        dynamic_profile.len(),
        scored.len()
    );

    result_composer::compose(&scored, nearby, context, matrix.len())
}

//! Failure values for external data sources
//!
//! Every "on failure, return X" policy lives here so collaborators and
//! tests agree on one table.

use crate::data::Occurrence;
use crate::pipeline::environment::ClimateReading;

/// Annual rainfall used when the climate provider has no usable total
pub const FALLBACK_RAINFALL_MM: f64 = 500.0;

/// Mean temperature used when the climate provider has no usable mean
pub const FALLBACK_AVG_TEMP_C: f64 = 15.0;

/// Climate reading returned on any provider failure
pub const CLIMATE_FALLBACK: ClimateReading = ClimateReading {
    rainfall_mm: FALLBACK_RAINFALL_MM,
    avg_temp_c: FALLBACK_AVG_TEMP_C,
};

/// Occurrences returned on any provider failure
pub fn occurrence_fallback() -> Vec<Occurrence> {
    Vec::new()
}

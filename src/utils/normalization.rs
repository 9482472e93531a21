//! Normalization Utilities
//!
//! Maps raw environmental quantities onto the [0, 1] scale used by the
//! reference trait matrix columns.

/// Soil pH lower bound of the trait scale
pub const PH_FLOOR: f64 = 3.0;

/// Width of the trait pH scale (3.0 - 9.0)
pub const PH_SPAN: f64 = 6.0;

/// Annual precipitation (mm) mapped to 1.0
pub const RAINFALL_CEILING_MM: f64 = 3000.0;

/// Clamp to [0, 1]
///
/// NaN maps to 0.0 so a bad upstream value cannot leak into the vector.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Normalize soil pH: (pH - 3) / 6, clamped
pub fn normalize_ph(soil_ph: f64) -> f64 {
    clamp_unit((soil_ph - PH_FLOOR) / PH_SPAN)
}

/// Normalize annual rainfall: mm / 3000, clamped
pub fn normalize_rainfall(rainfall_mm: f64) -> f64 {
    clamp_unit(rainfall_mm / RAINFALL_CEILING_MM)
}

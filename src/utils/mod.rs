//! Utility modules shared across the pipeline
//!
//! - Names: canonical species names for matching across sources
//! - Normalization: unit-interval scaling of raw environmental values

pub mod names;
pub mod normalization;

// Re-export commonly used functions
pub use names::canonicalize;
pub use normalization::{clamp_unit, normalize_ph, normalize_rainfall};

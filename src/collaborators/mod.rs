//! External data collaborators
//!
//! Climate and occurrence providers. Both recover locally from any
//! failure using the values in [`fallback`], so the pipeline never sees
//! an error from them.

pub mod climate;
pub mod fallback;
pub mod occurrences;

pub use climate::{ClimateSource, OpenMeteoClient};
pub use fallback::CLIMATE_FALLBACK;
pub use occurrences::{GbifClient, OccurrenceSource};

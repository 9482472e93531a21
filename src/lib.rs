//! Invasive Risk Rust Implementation
//!
//! Ranks reference plant species by how well their traits fit the
//! environment at a geographic point, and flags the ones already
//! observed nearby.
//!
//! Layout:
//! - `utils/`: name canonicalization and normalization
//! - `data`: reference matrix and occurrence catalog loading with Polars
//! - `pipeline/`: geo matching, environment profiling, similarity, composition
//! - `request`: scan request model and validation
//! - `config`: environment-driven service configuration
//! - `collaborators/`, `scanner`, `api_server`: async service surface (feature `api`)

pub mod utils;
pub mod data;
pub mod pipeline;
pub mod request;
pub mod config;

#[cfg(feature = "api")]
pub mod collaborators;
#[cfg(feature = "api")]
pub mod scanner;
#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use utils::canonicalize;
pub use data::{Datasets, Occurrence, OccurrenceCatalog, ReferenceMatrix, ReferenceTraitRow};
pub use pipeline::{run_pipeline, EnvironmentalContext, RiskLabel, RiskResult, ScanReport};
pub use request::{RequestError, ScanRequest};
pub use config::Config;

#[cfg(feature = "api")]
pub use scanner::{RiskScanner, ScanError};
#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};

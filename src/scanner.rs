//! Risk Scanner - coordinator for one risk scan
//!
//! Flow per request:
//!   1. Climate lookup and occurrence lookup run concurrently
//!   2. EnvironmentalProfiler turns the reading into a context
//!   3. Occurrences collapse into a canonical-name lookup
//!   4. Profile → similarity → composition on the blocking pool
//!
//! Holds only shared read-only state; a scanner is cheap to clone.

use crate::collaborators::{ClimateSource, OccurrenceSource};
use crate::data::ReferenceMatrix;
use crate::pipeline::{self, NearbyLookup, ScanReport};
use crate::request::{RequestError, ScanRequest};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error("scoring task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct RiskScanner {
    matrix: Arc<ReferenceMatrix>,
    climate: ClimateSource,
    occurrences: OccurrenceSource,
}

impl RiskScanner {
    pub fn new(matrix: Arc<ReferenceMatrix>, climate: ClimateSource, occurrences: OccurrenceSource) -> Self {
        Self { matrix, climate, occurrences }
    }

    /// Validate, gather external data, run the pipeline
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanReport, ScanError> {
        request.validate()?;

        let (reading, occurrences) = tokio::join!(
            self.climate.fetch(request.lat, request.lng),
            self.occurrences.fetch(request.lat, request.lng, request.radius_km),
        );

        let context = pipeline::profile(reading, request.biome_override());
        let nearby = NearbyLookup::from_occurrences(&occurrences);

        tracing::info!(
            "Scan ({:.4}, {:.4}) r={}km: biome={} ({:?}), rainfall={:.0}mm, {} occurrences / {} species nearby via {}",
            request.lat,
            request.lng,
            request.radius_km,
            context.biome_label,
            context.biome_source,
            context.rainfall_mm,
            occurrences.len(),
            nearby.len(),
            self.occurrences.name()
        );

        // CPU-bound work: run in blocking thread pool
        let matrix = Arc::clone(&self.matrix);
        let report = tokio::task::spawn_blocking(move || {
            pipeline::run_pipeline(
                &matrix,
                &context,
                &nearby,
                request.is_urban(),
                request.biome_override(),
            )
        })
        .await?;

        Ok(report)
    }
}

//! Occurrence source: species sightings around a point
//!
//! Live GBIF occurrence search or the static catalog. Never fails; an
//! unreachable feed yields an empty sequence. Deduplication by canonical
//! name happens in the caller (`NearbyLookup`), first seen wins.

use crate::collaborators::fallback::occurrence_fallback;
use crate::data::{Occurrence, OccurrenceCatalog};
use crate::pipeline::geo_matcher::find_nearby;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const GBIF_OCCURRENCE_URL: &str = "https://api.gbif.org/v1/occurrence/search";

/// Records requested per GBIF search
pub const GBIF_PAGE_LIMIT: u32 = 300;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<GbifRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GbifRecord {
    species: Option<String>,
    scientific_name: Option<String>,
    decimal_latitude: Option<f64>,
    decimal_longitude: Option<f64>,
    vernacular_name: Option<String>,
    family: Option<String>,
}

impl GbifRecord {
    /// Prefer the accepted species binomial, fall back to the verbatim name
    fn into_occurrence(self) -> Option<Occurrence> {
        let name = self
            .species
            .filter(|s| !s.trim().is_empty())
            .or(self.scientific_name)
            .filter(|s| !s.trim().is_empty())?;

        Some(Occurrence {
            scientific_name: name,
            latitude: self.decimal_latitude?,
            longitude: self.decimal_longitude?,
            common_name: self.vernacular_name.unwrap_or_default(),
            family: self.family.unwrap_or_default(),
        })
    }
}

fn parse_search(body: SearchResponse) -> Vec<Occurrence> {
    body.results
        .into_iter()
        .filter_map(GbifRecord::into_occurrence)
        .collect()
}

/// GBIF occurrence search client
#[derive(Clone)]
pub struct GbifClient {
    http: reqwest::Client,
    base_url: String,
}

impl GbifClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(GBIF_OCCURRENCE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("invasive_risk_rust/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build occurrence HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub async fn fetch(&self, lat: f64, lng: f64, radius_km: f64) -> Vec<Occurrence> {
        match self.try_fetch(lat, lng, radius_km).await {
            Ok(occurrences) => occurrences,
            Err(e) => {
                tracing::warn!(
                    "Occurrence search failed at ({:.4}, {:.4}): {:#}; continuing without nearby species",
                    lat,
                    lng,
                    e
                );
                occurrence_fallback()
            }
        }
    }

    async fn try_fetch(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<Occurrence>> {
        let radius_meters = (radius_km * 1000.0).round() as u64;
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("geoDistance", format!("{},{},{}m", lat, lng, radius_meters)),
                ("limit", GBIF_PAGE_LIMIT.to_string()),
                ("hasCoordinate", "true".to_string()),
                ("hasGeospatialIssue", "false".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(parse_search(body))
    }
}

/// Where nearby occurrences come from
#[derive(Clone)]
pub enum OccurrenceSource {
    Gbif(GbifClient),
    /// GeoMatcher over the static catalog
    Catalog {
        catalog: Arc<OccurrenceCatalog>,
        limit: usize,
    },
    /// Same occurrences for every point (tests, offline scans)
    Fixed(Vec<Occurrence>),
}

impl OccurrenceSource {
    pub async fn fetch(&self, lat: f64, lng: f64, radius_km: f64) -> Vec<Occurrence> {
        match self {
            OccurrenceSource::Gbif(client) => client.fetch(lat, lng, radius_km).await,
            OccurrenceSource::Catalog { catalog, limit } => {
                // Full catalog scan: run in blocking thread pool
                let catalog = Arc::clone(catalog);
                let limit = *limit;
                let scan = tokio::task::spawn_blocking(move || {
                    find_nearby(&catalog, lat, lng, radius_km, limit)
                        .into_iter()
                        .map(|nearby| nearby.occurrence)
                        .collect::<Vec<_>>()
                });
                match scan.await {
                    Ok(occurrences) => occurrences,
                    Err(e) => {
                        tracing::warn!("Catalog scan failed: {}; continuing without nearby species", e);
                        occurrence_fallback()
                    }
                }
            }
            OccurrenceSource::Fixed(occurrences) => occurrences.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OccurrenceSource::Gbif(_) => "gbif",
            OccurrenceSource::Catalog { .. } => "catalog",
            OccurrenceSource::Fixed(_) => "fixed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gbif_records() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"offset": 0, "limit": 300, "results": [
                {"species": "Hedera helix", "scientificName": "Hedera helix L.",
                 "decimalLatitude": 37.8, "decimalLongitude": -122.4,
                 "vernacularName": "English ivy", "family": "Araliaceae"},
                {"scientificName": "Rubus armeniacus Focke",
                 "decimalLatitude": 37.7, "decimalLongitude": -122.5},
                {"species": "", "scientificName": "",
                 "decimalLatitude": 1.0, "decimalLongitude": 1.0},
                {"species": "Cytisus scoparius", "decimalLatitude": 37.6}
            ]}"#,
        )
        .unwrap();

        let occurrences = parse_search(body);
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].scientific_name, "Hedera helix");
        assert_eq!(occurrences[0].common_name, "English ivy");
        assert_eq!(occurrences[0].family, "Araliaceae");
        assert_eq!(occurrences[1].scientific_name, "Rubus armeniacus Focke");
        assert_eq!(occurrences[1].common_name, "");
    }

    #[test]
    fn test_parse_empty_body() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parse_search(body).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_empty() {
        let client = GbifClient::with_base_url("http://127.0.0.1:9/search", Duration::from_millis(500)).unwrap();
        assert!(client.fetch(37.77, -122.42, 10.0).await.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_source_uses_geo_matcher() {
        let catalog = OccurrenceCatalog::from_rows(vec![
            Occurrence {
                scientific_name: "Hedera helix".into(),
                latitude: 37.78,
                longitude: -122.42,
                common_name: String::new(),
                family: String::new(),
            },
            Occurrence {
                scientific_name: "Cytisus scoparius".into(),
                latitude: 45.0,
                longitude: -122.42,
                common_name: String::new(),
                family: String::new(),
            },
        ]);
        let source = OccurrenceSource::Catalog { catalog: Arc::new(catalog), limit: 50 };
        let found = source.fetch(37.7749, -122.4194, 10.0).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].scientific_name, "Hedera helix");
    }
}

//! Climate source: annual rainfall and mean temperature at a point
//!
//! Open-Meteo historical archive, one calendar year of daily values:
//! rainfall is the sum of `precipitation_sum`, temperature the mean of
//! `temperature_2m_mean`. Never fails; see [`super::fallback`].

use crate::collaborators::fallback::{CLIMATE_FALLBACK, FALLBACK_AVG_TEMP_C, FALLBACK_RAINFALL_MM};
use crate::pipeline::environment::ClimateReading;
use anyhow::{Context, Result};
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;

pub const OPEN_METEO_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Calendar year summarised
const ARCHIVE_START: &str = "2023-01-01";
const ARCHIVE_END: &str = "2023-12-31";

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    daily: Option<DailySeries>,
}

#[derive(Debug, Default, Deserialize)]
struct DailySeries {
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
}

/// Reduce a year of daily values to a reading
///
/// Returns the reading and whether both fields came from data (a
/// non-positive rainfall total or an empty temperature series is
/// replaced by its fallback value).
fn summarise(daily: &DailySeries) -> (ClimateReading, bool) {
    let total_rain: f64 = daily.precipitation_sum.iter().flatten().sum();
    let temps: Vec<f64> = daily.temperature_2m_mean.iter().flatten().copied().collect();

    let rain_ok = total_rain > 0.0;
    let temp_ok = !temps.is_empty();

    let reading = ClimateReading {
        rainfall_mm: if rain_ok { total_rain } else { FALLBACK_RAINFALL_MM },
        avg_temp_c: if temp_ok {
            temps.iter().sum::<f64>() / temps.len() as f64
        } else {
            FALLBACK_AVG_TEMP_C
        },
    };
    (reading, rain_ok && temp_ok)
}

/// Cache key: coordinates rounded to 0.01°
fn cache_key(lat: f64, lng: f64) -> (i32, i32) {
    ((lat * 100.0).round() as i32, (lng * 100.0).round() as i32)
}

/// Open-Meteo archive client with a per-point reading cache
#[derive(Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<(i32, i32), ClimateReading>,
}

impl OpenMeteoClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(OPEN_METEO_ARCHIVE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("invasive_risk_rust/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build climate HTTP client")?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            cache,
        })
    }

    /// Reading for a point, fallback on any failure
    pub async fn fetch(&self, lat: f64, lng: f64) -> ClimateReading {
        let key = cache_key(lat, lng);
        if let Some(cached) = self.cache.get(&key).await {
            return cached;
        }

        match self.try_fetch(lat, lng).await {
            Ok((reading, true)) => {
                self.cache.insert(key, reading).await;
                reading
            }
            Ok((reading, false)) => {
                tracing::warn!(
                    "Incomplete climate data at ({:.4}, {:.4}); using fallback for missing fields",
                    lat,
                    lng
                );
                reading
            }
            Err(e) => {
                tracing::warn!("Climate lookup failed at ({:.4}, {:.4}): {:#}; using fallback", lat, lng, e);
                CLIMATE_FALLBACK
            }
        }
    }

    async fn try_fetch(&self, lat: f64, lng: f64) -> Result<(ClimateReading, bool)> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lng.to_string()),
                ("start_date", ARCHIVE_START.to_string()),
                ("end_date", ARCHIVE_END.to_string()),
                ("daily", "precipitation_sum,temperature_2m_mean".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ArchiveResponse = response.json().await?;
        Ok(summarise(&body.daily.unwrap_or_default()))
    }
}

/// Where climate readings come from
#[derive(Clone)]
pub enum ClimateSource {
    OpenMeteo(OpenMeteoClient),
    /// Same reading for every point (tests, offline scans)
    Fixed(ClimateReading),
}

impl ClimateSource {
    pub async fn fetch(&self, lat: f64, lng: f64) -> ClimateReading {
        match self {
            ClimateSource::OpenMeteo(client) => client.fetch(lat, lng).await,
            ClimateSource::Fixed(reading) => *reading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_summarise_full_year() {
        let body: ArchiveResponse = serde_json::from_str(
            r#"{"daily": {"time": ["2023-01-01", "2023-01-02", "2023-01-03"],
                "precipitation_sum": [1.5, null, 2.5],
                "temperature_2m_mean": [10.0, 20.0, null]}}"#,
        )
        .unwrap();
        let (reading, complete) = summarise(&body.daily.unwrap());
        assert!(complete);
        assert_relative_eq!(reading.rainfall_mm, 4.0);
        assert_relative_eq!(reading.avg_temp_c, 15.0);
    }

    #[test]
    fn test_summarise_zero_rain_uses_fallback() {
        let daily = DailySeries {
            precipitation_sum: vec![Some(0.0), Some(0.0)],
            temperature_2m_mean: vec![Some(30.0)],
        };
        let (reading, complete) = summarise(&daily);
        assert!(!complete);
        assert_relative_eq!(reading.rainfall_mm, FALLBACK_RAINFALL_MM);
        assert_relative_eq!(reading.avg_temp_c, 30.0);
    }

    #[test]
    fn test_summarise_missing_daily_block() {
        let body: ArchiveResponse = serde_json::from_str(r#"{"error": false}"#).unwrap();
        let (reading, complete) = summarise(&body.daily.unwrap_or_default());
        assert!(!complete);
        assert_eq!(reading, CLIMATE_FALLBACK);
    }

    #[test]
    fn test_cache_key_rounding() {
        assert_eq!(cache_key(37.7741, -122.41942), cache_key(37.7749, -122.4201));
        assert_ne!(cache_key(37.77, -122.41), cache_key(37.79, -122.41));
    }

    #[tokio::test]
    async fn test_unreachable_provider_returns_fallback() {
        // Port 9 (discard) on localhost: connection refused or timeout
        let client = OpenMeteoClient::with_base_url("http://127.0.0.1:9/archive", Duration::from_millis(500)).unwrap();
        assert_eq!(client.fetch(37.77, -122.42).await, CLIMATE_FALLBACK);
    }

    #[tokio::test]
    async fn test_fixed_source() {
        let reading = ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 };
        assert_eq!(ClimateSource::Fixed(reading).fetch(0.0, 0.0).await, reading);
    }
}

//! Service configuration from environment variables
//!
//! | Variable                  | Default                                   |
//! |---------------------------|-------------------------------------------|
//! | `APP_NAME`                | `Invasive Tracker API`                    |
//! | `APP_ENV` (or `ENV`)      | `dev`                                     |
//! | `API_V1_PREFIX`           | `/api/v1`                                 |
//! | `PORT`                    | `8000`                                    |
//! | `DATA_DIR`                | `data`                                    |
//! | `REFERENCE_MATRIX_PATH`   | `$DATA_DIR/vectorized_species_master.csv` |
//! | `CATALOG_PATH`            | `$DATA_DIR/invasive_species.csv`          |
//! | `OCCURRENCE_SOURCE`       | `gbif` (or `catalog`)                     |
//! | `CORS_ORIGINS`            | `http://localhost:5173,http://localhost:3000` |
//! | `CLIMATE_TIMEOUT_SECS`    | `5`                                       |
//! | `OCCURRENCE_TIMEOUT_SECS` | `10`                                      |
//! | `CATALOG_LIMIT`           | `200`                                     |

use crate::pipeline::geo_matcher::MAX_LIMIT;
use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

/// Default per-request budget for the climate provider (seconds)
pub const DEFAULT_CLIMATE_TIMEOUT_SECS: u64 = 5;

/// Default per-request budget for the occurrence provider (seconds)
pub const DEFAULT_OCCURRENCE_TIMEOUT_SECS: u64 = 10;

/// Which occurrence provider backs risk scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceBackend {
    Gbif,
    Catalog,
}

impl FromStr for OccurrenceBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gbif" => Ok(OccurrenceBackend::Gbif),
            "catalog" | "csv" => Ok(OccurrenceBackend::Catalog),
            other => bail!("unknown occurrence source '{}' (expected gbif or catalog)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub env: String,
    pub api_prefix: String,
    pub port: u16,
    pub reference_matrix_path: String,
    pub catalog_path: String,
    pub occurrence_backend: OccurrenceBackend,
    pub cors_origins: Vec<String>,
    pub climate_timeout: Duration,
    pub occurrence_timeout: Duration,
    pub catalog_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = get("DATA_DIR").unwrap_or_else(|| "data".to_string());

        let mut api_prefix = get("API_V1_PREFIX").unwrap_or_else(|| "/api/v1".to_string());
        if !api_prefix.starts_with('/') {
            api_prefix.insert(0, '/');
        }
        let api_prefix = api_prefix.trim_end_matches('/').to_string();

        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        };

        let catalog_limit: usize = parse_or(&get, "CATALOG_LIMIT", MAX_LIMIT)?;

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or_else(|| "Invasive Tracker API".to_string()),
            env: get("APP_ENV")
                .or_else(|| get("ENV"))
                .unwrap_or_else(|| "dev".to_string()),
            api_prefix,
            port: parse_or(&get, "PORT", 8000)?,
            reference_matrix_path: get("REFERENCE_MATRIX_PATH")
                .unwrap_or_else(|| format!("{}/vectorized_species_master.csv", data_dir)),
            catalog_path: get("CATALOG_PATH")
                .unwrap_or_else(|| format!("{}/invasive_species.csv", data_dir)),
            occurrence_backend: parse_or(&get, "OCCURRENCE_SOURCE", OccurrenceBackend::Gbif)?,
            cors_origins,
            climate_timeout: Duration::from_secs(parse_or(&get, "CLIMATE_TIMEOUT_SECS", DEFAULT_CLIMATE_TIMEOUT_SECS)?),
            occurrence_timeout: Duration::from_secs(parse_or(&get, "OCCURRENCE_TIMEOUT_SECS", DEFAULT_OCCURRENCE_TIMEOUT_SECS)?),
            catalog_limit: catalog_limit.clamp(1, MAX_LIMIT),
        })
    }

    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  APP: {} ({})", self.app_name, self.env);
        tracing::info!("  API prefix: {}", self.api_prefix);
        tracing::info!("  PORT: {}", self.port);
        tracing::info!("  Reference matrix: {}", self.reference_matrix_path);
        tracing::info!("  Catalog: {}", self.catalog_path);
        tracing::info!("  Occurrence source: {:?}", self.occurrence_backend);
        tracing::info!("  CORS origins: {:?}", self.cors_origins);
        tracing::info!(
            "  Timeouts: climate {:?}, occurrences {:?}",
            self.climate_timeout,
            self.occurrence_timeout
        );
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

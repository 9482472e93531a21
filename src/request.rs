//! Risk scan request and its validation
//!
//! Out-of-range parameters are rejected here, before any collaborator
//! call or pipeline stage runs.

use serde::Deserialize;
use thiserror::Error;

/// Default search radius (km)
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Largest accepted search radius (km)
pub const MAX_RADIUS_KM: f64 = 1000.0;

#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub biome_context: Option<String>,
    #[serde(default)]
    pub is_urban: Option<bool>,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("lat must be between -90 and 90 (got {0})")]
    Latitude(f64),

    #[error("lng must be between -180 and 180 (got {0})")]
    Longitude(f64),

    #[error("radius_km must be greater than 0 and at most {max} (got {value})")]
    Radius { value: f64, max: f64 },
}

/// Check point coordinates (shared with the nearby-species query)
pub fn validate_point(lat: f64, lng: f64) -> Result<(), RequestError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(RequestError::Latitude(lat));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(RequestError::Longitude(lng));
    }
    Ok(())
}

pub fn validate_radius(radius_km: f64) -> Result<(), RequestError> {
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_RADIUS_KM {
        return Err(RequestError::Radius { value: radius_km, max: MAX_RADIUS_KM });
    }
    Ok(())
}

impl ScanRequest {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            biome_context: None,
            is_urban: None,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        validate_point(self.lat, self.lng)?;
        validate_radius(self.radius_km)
    }

    pub fn is_urban(&self) -> bool {
        self.is_urban.unwrap_or(false)
    }

    /// Biome override, `None` when absent or blank
    pub fn biome_override(&self) -> Option<&str> {
        self.biome_context
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let req: ScanRequest = serde_json::from_str(r#"{"lat": 37.7749, "lng": -122.4194}"#).unwrap();
        assert_eq!(req.radius_km, DEFAULT_RADIUS_KM);
        assert!(!req.is_urban());
        assert_eq!(req.biome_override(), None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_null_optionals() {
        let req: ScanRequest = serde_json::from_str(
            r#"{"lat": 0, "lng": 0, "biome_context": null, "is_urban": null, "radius_km": 10}"#,
        )
        .unwrap();
        assert!(!req.is_urban());
        assert_eq!(req.radius_km, 10.0);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(ScanRequest::new(90.5, 0.0).validate(), Err(RequestError::Latitude(90.5)));
        assert_eq!(ScanRequest::new(0.0, -180.1).validate(), Err(RequestError::Longitude(-180.1)));
        assert!(ScanRequest::new(f64::NAN, 0.0).validate().is_err());

        let mut req = ScanRequest::new(10.0, 10.0);
        req.radius_km = 0.0;
        assert!(req.validate().is_err());
        req.radius_km = MAX_RADIUS_KM + 1.0;
        assert!(req.validate().is_err());
        req.radius_km = MAX_RADIUS_KM;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_edges_accepted() {
        assert!(ScanRequest::new(-90.0, 180.0).validate().is_ok());
        assert!(ScanRequest::new(90.0, -180.0).validate().is_ok());
    }

    #[test]
    fn test_blank_biome_is_none() {
        let mut req = ScanRequest::new(0.0, 0.0);
        req.biome_context = Some("  ".into());
        assert_eq!(req.biome_override(), None);
        req.biome_context = Some("Grassland".into());
        assert_eq!(req.biome_override(), Some("Grassland"));
    }
}

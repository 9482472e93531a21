//! GeoMatcher: nearby species occurrences
//!
//! Two-stage spatial query over the static catalog:
//!   1. Rectangular pre-filter in degrees (no trigonometry per row)
//!   2. Exact haversine distance for the surviving candidates
//!
//! Results are nearest-first and carry one occurrence per canonical name.
//! [`NearbyLookup`] turns any occurrence sequence (catalog or live feed)
//! into the canonical name → coordinates map used by the result composer.

use crate::data::{Occurrence, OccurrenceCatalog};
use crate::utils::canonicalize;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Kilometres per degree of latitude
pub const KM_PER_DEGREE_LAT: f64 = 110.574;

/// Kilometres per degree of longitude at the equator
pub const KM_PER_DEGREE_LNG_EQUATOR: f64 = 111.320;

/// Mean Earth radius (IUGG), km
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Upper bound on `limit`
pub const MAX_LIMIT: usize = 200;

/// Occurrence plus its distance from the query point
#[derive(Debug, Clone, Serialize)]
pub struct NearbyOccurrence {
    #[serde(flatten)]
    pub occurrence: Occurrence,
    pub distance_km: f64,
}

/// Great-circle distance in km
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Degree box enclosing the search circle
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Self {
        let delta_lat = radius_km / KM_PER_DEGREE_LAT;
        // Near the poles cos(lat) -> 0; floor keeps the box finite
        let cos_lat = lat.to_radians().cos().max(1e-6);
        let delta_lng = radius_km / (KM_PER_DEGREE_LNG_EQUATOR * cos_lat);

        Self {
            min_lat: lat - delta_lat,
            max_lat: lat + delta_lat,
            min_lng: lng - delta_lng,
            max_lng: lng + delta_lng,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// Find unique species within `radius_km` of a point, nearest first
///
/// - Keeps the closest occurrence per canonical name
/// - Distance ties keep catalog order (stable sort)
/// - `limit` is clamped to [1, 200]
/// - Empty catalog or nothing in range returns an empty Vec
pub fn find_nearby(
    catalog: &OccurrenceCatalog,
    lat: f64,
    lng: f64,
    radius_km: f64,
    limit: usize,
) -> Vec<NearbyOccurrence> {
    let bbox = BoundingBox::around(lat, lng, radius_km);

    let mut candidates: Vec<NearbyOccurrence> = catalog
        .rows()
        .iter()
        .filter(|occ| bbox.contains(occ.latitude, occ.longitude))
        .filter_map(|occ| {
            let distance_km = haversine_km(lat, lng, occ.latitude, occ.longitude);
            (distance_km <= radius_km).then(|| NearbyOccurrence {
                occurrence: occ.clone(),
                distance_km,
            })
        })
        .collect();

    if candidates.is_empty() {
        return candidates;
    }

    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    let limit = limit.clamp(1, MAX_LIMIT);
    let mut seen = FxHashSet::default();
    candidates
        .into_iter()
        .filter(|c| seen.insert(canonicalize(&c.occurrence.scientific_name)))
        .take(limit)
        .collect()
}

/// Canonical name → coordinates of the first occurrence seen
#[derive(Debug, Default, Clone)]
pub struct NearbyLookup {
    coords: FxHashMap<String, (f64, f64)>,
}

impl NearbyLookup {
    /// Build lookup, first occurrence per canonical name wins
    ///
    /// Occurrences whose name canonicalizes to "" are skipped.
    pub fn from_occurrences<'a, I>(occurrences: I) -> Self
    where
        I: IntoIterator<Item = &'a Occurrence>,
    {
        let mut coords = FxHashMap::default();
        for occ in occurrences {
            let key = canonicalize(&occ.scientific_name);
            if key.is_empty() {
                continue;
            }
            coords.entry(key).or_insert((occ.latitude, occ.longitude));
        }
        Self { coords }
    }

    /// Coordinates for an already-canonical name
    pub fn get(&self, canonical_name: &str) -> Option<(f64, f64)> {
        self.coords.get(canonical_name).copied()
    }

    pub fn contains(&self, canonical_name: &str) -> bool {
        self.coords.contains_key(canonical_name)
    }

    /// Number of distinct nearby species
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

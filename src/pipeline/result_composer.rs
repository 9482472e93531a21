//! ResultComposer: labels, nearby flags and final ordering
//!
//! Risk scores are raw cosine similarities, not calibrated probabilities.
//! Labels use fixed inclusive lower bounds, checked High first.

use crate::pipeline::environment::EnvironmentalContext;
use crate::pipeline::geo_matcher::NearbyLookup;
use crate::pipeline::similarity::ScoredRow;
use crate::utils::canonicalize;
use serde::{Serialize, Serializer};

/// Lower bound (inclusive) of the High label
pub const HIGH_RISK_THRESHOLD: f64 = 0.65;

/// Lower bound (inclusive) of the Moderate label
pub const MODERATE_RISK_THRESHOLD: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLabel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskLabel::High
        } else if score >= MODERATE_RISK_THRESHOLD {
            RiskLabel::Moderate
        } else {
            RiskLabel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low Risk",
            RiskLabel::Moderate => "Moderate Risk",
            RiskLabel::High => "High Risk",
        }
    }
}

/// One scored reference species
#[derive(Debug, Clone, Serialize)]
pub struct RiskResult {
    pub scientific_name: String,
    pub common_name: String,
    #[serde(serialize_with = "bool_as_int")]
    pub is_invasive: bool,
    pub risk_score: f64,
    pub risk_label: RiskLabel,
    #[serde(rename = "found_in_gbif_radius")]
    pub found_nearby: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Summary of the inputs behind a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanMeta {
    pub rainfall_used: f64,
    pub avg_temp_used: f64,
    pub soil_ph_used: f64,
    /// Effective biome: the override verbatim, else the derived name.
    /// Always a string, never null, so clients see the biome the scan used.
    pub biome: String,
    /// Distinct canonical names in the nearby lookup
    pub species_found_nearby: usize,
    /// Reference species considered by the scorer
    pub species_in_ml_dataset: usize,
    /// Results flagged `found_nearby`
    pub species_tagged_in_radius: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub meta: ScanMeta,
    pub results: Vec<RiskResult>,
}

fn bool_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Merge scores with nearby occurrences into the final report
///
/// Ordering: nearby species first, then score descending. Score ties keep
/// the scorer's order.
pub fn compose(
    scored: &[ScoredRow<'_>],
    nearby: &NearbyLookup,
    context: &EnvironmentalContext,
    species_in_dataset: usize,
) -> ScanReport {
    let mut results: Vec<RiskResult> = scored
        .iter()
        .map(|s| {
            let coords = nearby.get(&canonicalize(&s.row.scientific_name));
            RiskResult {
                scientific_name: s.row.scientific_name.clone(),
                common_name: s.row.common_name.clone(),
                is_invasive: s.row.is_invasive,
                risk_score: s.score,
                risk_label: RiskLabel::from_score(s.score),
                found_nearby: coords.is_some(),
                latitude: coords.map(|(lat, _)| lat),
                longitude: coords.map(|(_, lng)| lng),
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.found_nearby
            .cmp(&a.found_nearby)
            .then_with(|| b.risk_score.total_cmp(&a.risk_score))
    });

    let species_tagged_in_radius = results.iter().filter(|r| r.found_nearby).count();

    ScanReport {
        meta: ScanMeta {
            rainfall_used: context.rainfall_mm,
            avg_temp_used: context.avg_temp_c,
            soil_ph_used: context.soil_ph,
            biome: context.biome_label.clone(),
            species_found_nearby: nearby.len(),
            species_in_ml_dataset: species_in_dataset,
            species_tagged_in_radius,
        },
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Occurrence, ReferenceTraitRow};
    use crate::pipeline::environment::{profile, ClimateReading};

    #[test]
    fn test_label_boundaries() {
        assert_eq!(RiskLabel::from_score(0.65), RiskLabel::High);
        assert_eq!(RiskLabel::from_score(0.6499), RiskLabel::Moderate);
        assert_eq!(RiskLabel::from_score(0.45), RiskLabel::Moderate);
        assert_eq!(RiskLabel::from_score(0.4499), RiskLabel::Low);
        assert_eq!(RiskLabel::from_score(1.0), RiskLabel::High);
        assert_eq!(RiskLabel::from_score(0.0), RiskLabel::Low);
    }

    fn trait_row(name: &str, invasive: bool) -> ReferenceTraitRow {
        ReferenceTraitRow {
            scientific_name: name.to_string(),
            is_invasive: invasive,
            common_name: format!("{} common", name),
            feature_vector: vec![],
        }
    }

    fn occ(name: &str, lat: f64, lng: f64) -> Occurrence {
        Occurrence {
            scientific_name: name.to_string(),
            latitude: lat,
            longitude: lng,
            common_name: String::new(),
            family: String::new(),
        }
    }

    #[test]
    fn test_nearby_first_then_score() {
        let rows = vec![
            trait_row("High far", true),
            trait_row("Rubus armeniacus (Focke)", true),
            trait_row("Mid far", false),
            trait_row("Hedera helix", true),
            trait_row("Tie far", false),
        ];
        let scores = [0.95, 0.30, 0.50, 0.70, 0.50];
        let scored: Vec<ScoredRow> = rows
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(index, (row, score))| ScoredRow { row, index, score })
            .collect();

        let feed = vec![occ("rubus armeniacus", 37.8, -122.4), occ("HEDERA HELIX", 37.7, -122.5)];
        let nearby = NearbyLookup::from_occurrences(&feed);
        let ctx = profile(ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 }, None);

        let report = compose(&scored, &nearby, &ctx, 1234);
        let names: Vec<&str> = report.results.iter().map(|r| r.scientific_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Hedera helix", "Rubus armeniacus (Focke)", "High far", "Mid far", "Tie far"]
        );

        // Every nearby result precedes every non-nearby one
        let first_far = report.results.iter().position(|r| !r.found_nearby).unwrap();
        assert!(report.results[first_far..].iter().all(|r| !r.found_nearby));

        let rubus = &report.results[1];
        assert_eq!(rubus.latitude, Some(37.8));
        assert_eq!(rubus.longitude, Some(-122.4));
        assert_eq!(rubus.risk_label, RiskLabel::Low);
        assert_eq!(report.results[2].latitude, None);

        assert_eq!(report.meta.species_found_nearby, 2);
        assert_eq!(report.meta.species_in_ml_dataset, 1234);
        assert_eq!(report.meta.species_tagged_in_radius, 2);
        assert_eq!(report.meta.biome, "Forest");
    }

    #[test]
    fn test_empty_inputs_give_zero_counts() {
        let ctx = profile(ClimateReading { rainfall_mm: 500.0, avg_temp_c: 15.0 }, None);
        let report = compose(&[], &NearbyLookup::default(), &ctx, 0);
        assert!(report.results.is_empty());
        assert_eq!(report.meta.species_found_nearby, 0);
        assert_eq!(report.meta.species_tagged_in_radius, 0);
    }

    #[test]
    fn test_wire_format() {
        let row = trait_row("Hedera helix", true);
        let scored = [ScoredRow { row: &row, index: 0, score: 0.7 }];
        let ctx = profile(ClimateReading { rainfall_mm: 100.0, avg_temp_c: 30.0 }, None);
        let report = compose(&scored, &NearbyLookup::default(), &ctx, 1);

        let json = serde_json::to_value(&report).unwrap();
        let first = &json["results"][0];
        assert_eq!(first["is_invasive"], 1);
        assert_eq!(first["risk_label"], "High Risk");
        assert_eq!(first["found_in_gbif_radius"], false);
        assert!(first["latitude"].is_null());
        assert_eq!(json["meta"]["biome"], "Desert");
        assert_eq!(json["meta"]["soil_ph_used"], 7.5);
    }
}

// Pipeline Integration Tests
//
// Purpose: Run the synchronous pipeline end to end over a small in-memory
// reference matrix and catalog.
// Run with: cargo test --test pipeline_tests

use approx::assert_relative_eq;
use invasive_risk_rust::data::{Occurrence, OccurrenceCatalog, ReferenceMatrix, ReferenceTraitRow};
use invasive_risk_rust::pipeline::{
    self, features, find_nearby, ClimateReading, NearbyLookup, RiskLabel,
};

// Helper: feature order used by every test matrix
fn feature_names() -> Vec<String> {
    features::ALL.iter().map(|s| s.to_string()).collect()
}

fn trait_row(name: &str, invasive: bool, vector: [f64; 6]) -> ReferenceTraitRow {
    ReferenceTraitRow {
        scientific_name: name.to_string(),
        is_invasive: invasive,
        common_name: String::new(),
        feature_vector: vector.to_vec(),
    }
}

fn forest_query() -> [f64; 6] {
    // 1200 mm / 22 °C, not urban: Forest, soil pH 5.5
    let ph = (5.5 - 3.0) / 6.0;
    [0.5, ph, ph, 0.4, 0.0, 0.0]
}

fn test_matrix() -> ReferenceMatrix {
    ReferenceMatrix::from_parts(
        feature_names(),
        vec![
            trait_row("Hedera helix", true, forest_query()),
            trait_row("Bare species", false, [0.0; 6]),
            trait_row("Festuca rubra", false, [0.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            trait_row("Cytisus scoparius (L.) Link", true, [1.0, 0.9, 0.9, 0.1, 0.0, 0.0]),
        ],
    )
    .unwrap()
}

fn occurrence(name: &str, lat: f64, lng: f64) -> Occurrence {
    Occurrence {
        scientific_name: name.to_string(),
        latitude: lat,
        longitude: lng,
        common_name: String::new(),
        family: String::new(),
    }
}

fn scan(
    matrix: &ReferenceMatrix,
    reading: ClimateReading,
    occurrences: &[Occurrence],
    is_urban: bool,
    biome_override: Option<&str>,
) -> pipeline::ScanReport {
    let context = pipeline::profile(reading, biome_override);
    let nearby = NearbyLookup::from_occurrences(occurrences);
    pipeline::run_pipeline(matrix, &context, &nearby, is_urban, biome_override)
}

// =========================================================================
// Section 1: Environment
// =========================================================================

#[test]
fn test_forest_scan_matches_exact_profile() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &[],
        false,
        None,
    );

    assert_eq!(report.meta.biome, "Forest");
    assert_relative_eq!(report.meta.soil_ph_used, 5.5);
    assert_relative_eq!(report.meta.rainfall_used, 1200.0);
    assert_relative_eq!(report.meta.avg_temp_used, 22.0);
    assert_eq!(report.meta.species_in_ml_dataset, 4);
    assert_eq!(report.meta.species_found_nearby, 0);

    let top = &report.results[0];
    assert_eq!(top.scientific_name, "Hedera helix");
    assert_relative_eq!(top.risk_score, 1.0, epsilon = 1e-9);
    assert_eq!(top.risk_label, RiskLabel::High);
}

#[test]
fn test_desert_reading() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 100.0, avg_temp_c: 25.0 },
        &[],
        false,
        None,
    );

    assert_eq!(report.meta.biome, "Desert");
    assert_relative_eq!(report.meta.soil_ph_used, 7.5);
}

#[test]
fn test_unknown_override_keeps_label_and_default_ph() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &[],
        false,
        Some("Mangrove"),
    );

    assert_eq!(report.meta.biome, "Mangrove");
    assert_relative_eq!(report.meta.soil_ph_used, 6.5);
}

// =========================================================================
// Section 2: Scoring
// =========================================================================

#[test]
fn test_zero_vector_scores_zero() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &[],
        false,
        None,
    );

    let bare = report
        .results
        .iter()
        .find(|r| r.scientific_name == "Bare species")
        .unwrap();
    assert_relative_eq!(bare.risk_score, 0.0);
    assert_eq!(bare.risk_label, RiskLabel::Low);
}

#[test]
fn test_grassland_override_sets_habit() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &[],
        false,
        Some("Grassland"),
    );

    let festuca = report
        .results
        .iter()
        .find(|r| r.scientific_name == "Festuca rubra")
        .unwrap();
    assert!(festuca.risk_score > 0.0);
    assert_relative_eq!(report.meta.soil_ph_used, 7.0);
}

#[test]
fn test_scores_bounded_and_descending_without_nearby() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 600.0, avg_temp_c: 5.0 },
        &[],
        true,
        None,
    );

    assert_eq!(report.results.len(), 4);
    for pair in report.results.windows(2) {
        assert!(pair[0].risk_score >= pair[1].risk_score);
    }
    for r in &report.results {
        assert!((0.0..=1.0 + 1e-12).contains(&r.risk_score));
        assert_eq!(r.risk_label, RiskLabel::from_score(r.risk_score));
    }
}

// =========================================================================
// Section 3: Nearby flags and ordering
// =========================================================================

#[test]
fn test_nearby_species_sort_first() {
    let matrix = test_matrix();
    let occurrences = vec![
        occurrence("bare species", 37.78, -122.41),
        occurrence("Cytisus scoparius", 37.76, -122.43),
        occurrence("Cytisus scoparius (L.) Link", 10.0, 10.0),
    ];
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &occurrences,
        false,
        None,
    );

    assert_eq!(report.meta.species_found_nearby, 2);
    assert_eq!(report.meta.species_tagged_in_radius, 2);

    // Nearby block first, score descending inside it
    assert!(report.results[0].found_nearby);
    assert!(report.results[1].found_nearby);
    assert_eq!(report.results[0].scientific_name, "Cytisus scoparius (L.) Link");
    assert_eq!(report.results[1].scientific_name, "Bare species");
    assert!(!report.results[2].found_nearby);
    assert_eq!(report.results[2].scientific_name, "Hedera helix");

    // First occurrence for a canonical name wins
    assert_eq!(report.results[0].latitude, Some(37.76));
    assert_eq!(report.results[0].longitude, Some(-122.43));
    assert_eq!(report.results[2].latitude, None);
}

#[test]
fn test_catalog_feeds_nearby_lookup() {
    let matrix = test_matrix();
    let catalog = OccurrenceCatalog::from_rows(vec![
        occurrence("Hedera helix", 37.7750, -122.4195),
        occurrence("Festuca rubra", 38.9, -122.4194),
    ]);

    let found: Vec<Occurrence> = find_nearby(&catalog, 37.7749, -122.4194, 10.0, 50)
        .into_iter()
        .map(|n| n.occurrence)
        .collect();
    assert_eq!(found.len(), 1);

    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &found,
        false,
        None,
    );
    let tagged: Vec<&str> = report
        .results
        .iter()
        .filter(|r| r.found_nearby)
        .map(|r| r.scientific_name.as_str())
        .collect();
    assert_eq!(tagged, vec!["Hedera helix"]);
}

#[test]
fn test_report_wire_format() {
    let matrix = test_matrix();
    let report = scan(
        &matrix,
        ClimateReading { rainfall_mm: 1200.0, avg_temp_c: 22.0 },
        &[occurrence("Hedera helix", 37.7, -122.4)],
        false,
        None,
    );

    let json = serde_json::to_value(&report).unwrap();
    let first = &json["results"][0];
    assert_eq!(first["risk_label"], "High Risk");
    assert_eq!(first["is_invasive"], 1);
    assert_eq!(first["found_in_gbif_radius"], true);
    assert_eq!(json["meta"]["biome"], "Forest");
    assert!(json["results"][1]["latitude"].is_null());
}

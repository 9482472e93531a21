//! Offline risk scan for one location
//!
//! Runs the full pipeline against local files with a caller-supplied
//! climate reading. No network, no async runtime.
//!
//! Usage:
//!   cargo run --bin scan_location -- <MATRIX> <LAT> <LNG> <RAINFALL_MM> <AVG_TEMP_C> \
//!       [--biome Forest] [--radius-km 50] [--catalog invasive_species.csv]

use anyhow::Result;
use clap::Parser;
use invasive_risk_rust::data::{OccurrenceCatalog, ReferenceMatrix};
use invasive_risk_rust::pipeline::{self, find_nearby, geo_matcher::MAX_LIMIT, ClimateReading, NearbyLookup};
use invasive_risk_rust::request::{validate_point, validate_radius, DEFAULT_RADIUS_KM};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "scan_location",
    about = "Rank reference species by environmental fit at one point",
    version,
    allow_negative_numbers = true
)]
struct Cli {
    /// Reference trait matrix (CSV or Parquet)
    matrix: PathBuf,

    /// Latitude in degrees
    lat: f64,

    /// Longitude in degrees
    lng: f64,

    /// Annual rainfall (mm)
    rainfall_mm: f64,

    /// Mean annual temperature (°C)
    avg_temp_c: f64,

    /// Biome override (e.g. Forest, Grassland)
    #[arg(long)]
    biome: Option<String>,

    /// Radius for flagging catalog species (km)
    #[arg(long, env = "RADIUS_KM", default_value_t = DEFAULT_RADIUS_KM)]
    radius_km: f64,

    /// Occurrence catalog CSV; without it no species are flagged nearby
    #[arg(long, env = "CATALOG_PATH", value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Treat the point as urban
    #[arg(long)]
    urban: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    validate_point(cli.lat, cli.lng)?;
    validate_radius(cli.radius_km)?;

    let reading = ClimateReading {
        rainfall_mm: cli.rainfall_mm,
        avg_temp_c: cli.avg_temp_c,
    };
    let biome_override = cli.biome.as_deref();
    let matrix_path = cli.matrix.to_string_lossy();

    println!("Loading reference matrix from {}...", matrix_path);
    let load_start = Instant::now();
    let matrix = ReferenceMatrix::load(&matrix_path)?;
    let catalog = match &cli.catalog {
        Some(path) => OccurrenceCatalog::load_or_empty(&path.to_string_lossy()),
        None => OccurrenceCatalog::empty(),
    };
    println!(
        "  {} species x {} features, {} catalog occurrences ({:.2?})\n",
        matrix.len(),
        matrix.schema().len(),
        catalog.len(),
        load_start.elapsed()
    );

    let scan_start = Instant::now();
    let occurrences: Vec<_> = find_nearby(&catalog, cli.lat, cli.lng, cli.radius_km, MAX_LIMIT)
        .into_iter()
        .map(|n| n.occurrence)
        .collect();
    let nearby = NearbyLookup::from_occurrences(&occurrences);
    let context = pipeline::profile(reading, biome_override);
    let report = pipeline::run_pipeline(&matrix, &context, &nearby, cli.urban, biome_override);
    let scan_time = scan_start.elapsed();

    println!("Location: ({:.4}, {:.4}), radius {} km", cli.lat, cli.lng, cli.radius_km);
    println!(
        "Biome: {} ({:?}), rainfall {:.0} mm, temp {:.1} °C, soil pH {:.1}",
        report.meta.biome,
        context.biome_source,
        report.meta.rainfall_used,
        report.meta.avg_temp_used,
        report.meta.soil_ph_used
    );
    println!(
        "Nearby species: {}, tagged in results: {}\n",
        report.meta.species_found_nearby, report.meta.species_tagged_in_radius
    );

    println!("{:<4} {:<40} {:>7} {:<14} {:>8} {:>6}", "#", "Species", "Score", "Label", "Invasive", "Nearby");
    println!("{}", "-".repeat(84));
    for (rank, result) in report.results.iter().enumerate() {
        println!(
            "{:<4} {:<40} {:>7.4} {:<14} {:>8} {:>6}",
            rank + 1,
            result.scientific_name,
            result.risk_score,
            result.risk_label.as_str(),
            if result.is_invasive { "yes" } else { "" },
            if result.found_nearby { "*" } else { "" }
        );
    }

    println!("\nScanned {} species in {:.2?}", report.meta.species_in_ml_dataset, scan_time);
    Ok(())
}

//! EnvironmentalProfiler: biome classification and soil pH
//!
//! Whittaker-style decision tree from annual rainfall and mean temperature,
//! followed by a fixed biome → soil pH table. A caller-supplied biome
//! always overrides the derived one.

use serde::Serialize;
use std::fmt;

/// Coarse ecological classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Biome {
    Desert,
    Grassland,
    Forest,
    Rainforest,
    Wetland,
    Chaparral,
    Tundra,
    Taiga,
}

impl Biome {
    /// Exact-name lookup ("Forest" -> Forest)
    ///
    /// Case-sensitive, matching the names callers send as overrides.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Desert" => Some(Biome::Desert),
            "Grassland" => Some(Biome::Grassland),
            "Forest" => Some(Biome::Forest),
            "Rainforest" => Some(Biome::Rainforest),
            "Wetland" => Some(Biome::Wetland),
            "Chaparral" => Some(Biome::Chaparral),
            "Tundra" => Some(Biome::Tundra),
            "Taiga" => Some(Biome::Taiga),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Biome::Desert => "Desert",
            Biome::Grassland => "Grassland",
            Biome::Forest => "Forest",
            Biome::Rainforest => "Rainforest",
            Biome::Wetland => "Wetland",
            Biome::Chaparral => "Chaparral",
            Biome::Tundra => "Tundra",
            Biome::Taiga => "Taiga",
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Soil pH for biomes missing from the table
pub const DEFAULT_SOIL_PH: f64 = 6.5;

/// Annual climate signals at a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateReading {
    pub rainfall_mm: f64,
    pub avg_temp_c: f64,
}

/// Where the biome came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomeSource {
    Override,
    Derived,
}

/// Per-request environmental profile
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentalContext {
    /// `None` only for an override that names no known biome
    pub biome: Option<Biome>,
    /// Biome string actually used (override text kept verbatim)
    pub biome_label: String,
    pub biome_source: BiomeSource,
    pub rainfall_mm: f64,
    pub avg_temp_c: f64,
    pub soil_ph: f64,
}

/// Classify biome from annual rainfall (mm) and mean temperature (°C)
///
/// Evaluated in fixed order: rainfall extremes first, then temperature
/// bands with band-specific rainfall splits.
pub fn derive_biome(rainfall_mm: f64, avg_temp_c: f64) -> Biome {
    if rainfall_mm < 250.0 {
        return Biome::Desert;
    }
    if rainfall_mm > 2000.0 {
        return Biome::Rainforest;
    }

    if avg_temp_c > 20.0 {
        if rainfall_mm < 1000.0 { Biome::Grassland } else { Biome::Forest }
    } else if avg_temp_c > 10.0 {
        if rainfall_mm < 800.0 { Biome::Grassland } else { Biome::Forest }
    } else if rainfall_mm < 500.0 {
        Biome::Tundra
    } else {
        Biome::Taiga
    }
}

/// Typical topsoil pH by biome
pub fn soil_ph(biome: Option<Biome>) -> f64 {
    match biome {
        Some(Biome::Desert) => 7.5,
        Some(Biome::Grassland) => 7.0,
        Some(Biome::Forest) => 5.5,
        Some(Biome::Rainforest) => 4.5,
        Some(Biome::Wetland) => 6.0,
        Some(Biome::Chaparral) => 7.0,
        _ => DEFAULT_SOIL_PH,
    }
}

/// Build the environmental context for one request
///
/// `reading` is whatever the climate source resolved, fallback values
/// included. A non-blank `biome_override` wins over the derived biome.
pub fn profile(reading: ClimateReading, biome_override: Option<&str>) -> EnvironmentalContext {
    let override_label = biome_override.map(str::trim).filter(|s| !s.is_empty());

    let (biome, biome_label, biome_source) = match override_label {
        Some(label) => (Biome::from_name(label), label.to_string(), BiomeSource::Override),
        None => {
            let derived = derive_biome(reading.rainfall_mm, reading.avg_temp_c);
            (Some(derived), derived.name().to_string(), BiomeSource::Derived)
        }
    };

    EnvironmentalContext {
        biome,
        biome_label,
        biome_source,
        rainfall_mm: reading.rainfall_mm,
        avg_temp_c: reading.avg_temp_c,
        soil_ph: soil_ph(biome),
    }
}

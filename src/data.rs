//! Data Loading and Management
//!
//! Handles loading the reference trait matrix and the static occurrence
//! catalog with Polars. Both are loaded once at startup into immutable,
//! `Arc`-shared structures and are never mutated afterwards.
//!
//! Dataset layout:
//! - Reference matrix: `scientific_name`, `is_invasive`, optional
//!   `common_name` / `image_url`, every other column is a numeric feature
//! - Occurrence catalog: `latitude`, `longitude`, `scientific_name`,
//!   optional `common_name` / `family`

use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Columns of the reference matrix that are never features
pub const METADATA_COLUMNS: [&str; 4] = ["scientific_name", "is_invasive", "common_name", "image_url"];

/// Errors that make a dataset unusable
///
/// A malformed reference matrix must abort startup rather than serve
/// requests against a partial feature space.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset {path} is missing required columns: {missing:?}")]
    MissingColumns { path: String, missing: Vec<String> },

    #[error("reference matrix {path} has no feature columns")]
    NoFeatures { path: String },

    #[error("feature column '{column}' is not numeric (found {dtype})")]
    NonNumericFeature { column: String, dtype: String },

    #[error("row {row}: unrecognized is_invasive value '{value}'")]
    InvalidFlag { row: usize, value: String },

    #[error("row '{name}' has {found} feature values, schema has {expected}")]
    RowWidth { name: String, found: usize, expected: usize },

    #[error("duplicate feature column '{0}'")]
    DuplicateFeature(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

// ============================================================================
// Occurrences
// ============================================================================

/// A single observed sighting of a species
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    pub scientific_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub common_name: String,
    pub family: String,
}

/// Static occurrence catalog (load-once alternative to a live feed)
#[derive(Debug, Default)]
pub struct OccurrenceCatalog {
    rows: Vec<Occurrence>,
}

impl OccurrenceCatalog {
    pub fn from_rows(rows: Vec<Occurrence>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load catalog CSV
    ///
    /// Column names are trimmed. Rows with non-numeric coordinates or an
    /// empty scientific name are dropped. Missing optional columns become
    /// empty strings.
    pub fn load(path: &str) -> Result<Self> {
        let df = read_table(path)?;
        let columns = ColumnNames::new(&df);

        let missing = columns.missing(&["latitude", "longitude", "scientific_name"]);
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns { path: path.to_string(), missing }.into());
        }

        let lat = f64_values(&df, columns.original("latitude"))?;
        let lng = f64_values(&df, columns.original("longitude"))?;
        let names = string_values(&df, columns.original("scientific_name"))?;
        let common = optional_string_values(&df, &columns, "common_name")?;
        let family = optional_string_values(&df, &columns, "family")?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(latitude), Some(longitude)) = (lat[i], lng[i]) else {
                continue;
            };
            let name = names[i].trim();
            if name.is_empty() {
                continue;
            }
            rows.push(Occurrence {
                scientific_name: name.to_string(),
                latitude,
                longitude,
                common_name: common[i].trim().to_string(),
                family: family[i].trim().to_string(),
            });
        }

        let dropped = df.height() - rows.len();
        if dropped > 0 {
            tracing::debug!("Catalog {}: dropped {} rows without coordinates or name", path, dropped);
        }

        Ok(Self { rows })
    }

    /// Load catalog, falling back to an empty catalog on any failure
    ///
    /// The live occurrence feed is the primary source, so a missing
    /// catalog only disables catalog lookups.
    pub fn load_or_empty(path: &str) -> Self {
        if !Path::new(path).exists() {
            tracing::warn!("Occurrence catalog {} not found; using empty catalog", path);
            return Self::empty();
        }
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Failed to load occurrence catalog {}: {:#}; using empty catalog", path, e);
                Self::empty()
            }
        }
    }

    pub fn rows(&self) -> &[Occurrence] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Reference trait matrix
// ============================================================================

/// Ordered feature names plus the name → column index lookup
///
/// Built once when the matrix is loaded. Profiles are projected through
/// `index` so column identity is by name, never by position.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
    fingerprint: u64,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> std::result::Result<Self, DatasetError> {
        let mut index = FxHashMap::default();
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(DatasetError::DuplicateFeature(name.clone()));
            }
        }

        let mut hasher = FxHasher::default();
        names.hash(&mut hasher);
        let fingerprint = hasher.finish();

        Ok(Self { names, index, fingerprint })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Stable hash of the ordered names, logged at load
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// One known species in the trait feature space
#[derive(Debug, Clone)]
pub struct ReferenceTraitRow {
    pub scientific_name: String,
    pub is_invasive: bool,
    pub common_name: String,
    /// `feature_vector[i]` is the value of `schema.names()[i]`
    pub feature_vector: Vec<f64>,
}

/// Reference trait matrix (read-only after load)
#[derive(Debug)]
pub struct ReferenceMatrix {
    schema: FeatureSchema,
    rows: Vec<ReferenceTraitRow>,
}

impl ReferenceMatrix {
    /// Assemble a matrix from already-parsed rows
    pub fn from_parts(
        feature_names: Vec<String>,
        rows: Vec<ReferenceTraitRow>,
    ) -> std::result::Result<Self, DatasetError> {
        let schema = FeatureSchema::new(feature_names)?;
        for row in &rows {
            if row.feature_vector.len() != schema.len() {
                return Err(DatasetError::RowWidth {
                    name: row.scientific_name.clone(),
                    found: row.feature_vector.len(),
                    expected: schema.len(),
                });
            }
        }
        Ok(Self { schema, rows })
    }

    /// Load matrix from CSV (or Parquet, by extension)
    pub fn load(path: &str) -> Result<Self> {
        let df = read_table(path)?;
        let matrix = Self::from_dataframe(&df, path)
            .with_context(|| format!("Invalid reference matrix: {}", path))?;

        tracing::info!(
            "Reference matrix {}: {} species x {} features (schema {:016x})",
            path,
            matrix.len(),
            matrix.schema.len(),
            matrix.schema.fingerprint()
        );
        Ok(matrix)
    }

    fn from_dataframe(df: &DataFrame, path: &str) -> std::result::Result<Self, DatasetError> {
        let columns = ColumnNames::new(df);

        let missing = columns.missing(&["scientific_name", "is_invasive"]);
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns { path: path.to_string(), missing });
        }

        let feature_names: Vec<String> = columns
            .trimmed()
            .filter(|name| !METADATA_COLUMNS.contains(name))
            .map(str::to_string)
            .collect();
        if feature_names.is_empty() {
            return Err(DatasetError::NoFeatures { path: path.to_string() });
        }

        let names = string_values(df, columns.original("scientific_name"))?;
        let invasive = flag_values(df, columns.original("is_invasive"))?;
        let common = optional_string_values(df, &columns, "common_name")?;

        // Column-major read, then transpose into rows
        let mut feature_columns = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let original = columns.original(name);
            let column = df.column(original)?;
            // An all-empty column is inferred as str; it loads as zeros
            if matches!(column.dtype(), DataType::String) && column.null_count() < column.len() {
                return Err(DatasetError::NonNumericFeature {
                    column: name.clone(),
                    dtype: column.dtype().to_string(),
                });
            }
            feature_columns.push(f64_values(df, original)?);
        }

        let rows = (0..df.height())
            .map(|i| ReferenceTraitRow {
                scientific_name: names[i].trim().to_string(),
                is_invasive: invasive[i],
                common_name: common[i].trim().to_string(),
                feature_vector: feature_columns.iter().map(|c| c[i].unwrap_or(0.0)).collect(),
            })
            .collect();

        Self::from_parts(feature_names, rows)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[ReferenceTraitRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Process-wide datasets
// ============================================================================

/// Immutable handle to everything loaded at startup
#[derive(Clone)]
pub struct Datasets {
    pub matrix: Arc<ReferenceMatrix>,
    pub catalog: Arc<OccurrenceCatalog>,
}

impl Datasets {
    /// Load reference matrix (fatal on error) and catalog (best effort)
    pub fn load(matrix_path: &str, catalog_path: &str) -> Result<Self> {
        tracing::info!("Loading reference trait matrix from {}...", matrix_path);
        let matrix = ReferenceMatrix::load(matrix_path)?;

        tracing::info!("Loading occurrence catalog from {}...", catalog_path);
        let catalog = OccurrenceCatalog::load_or_empty(catalog_path);
        tracing::info!("  Catalog occurrences: {}", catalog.len());

        Ok(Self {
            matrix: Arc::new(matrix),
            catalog: Arc::new(catalog),
        })
    }

    /// Drop this handle's references at shutdown
    pub fn release(self) {
        let matrix_refs = Arc::strong_count(&self.matrix);
        let catalog_refs = Arc::strong_count(&self.catalog);
        drop(self);
        tracing::info!(
            "Released datasets (matrix handles: {}, catalog handles: {})",
            matrix_refs,
            catalog_refs
        );
    }
}

// ============================================================================
// Polars helpers
// ============================================================================

fn read_table(path: &str) -> Result<DataFrame> {
    let is_parquet = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to scan parquet: {}", path))?
            .collect()
            .with_context(|| format!("Failed to load parquet: {}", path))
    } else {
        // Infer over every row so a late fractional value keeps the column Float64
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {}", path))?
            .finish()
            .with_context(|| format!("Failed to load CSV: {}", path))
    }
}

/// Header lookup tolerant of stray whitespace in column names
struct ColumnNames {
    /// (trimmed, original)
    pairs: Vec<(String, String)>,
}

impl ColumnNames {
    fn new(df: &DataFrame) -> Self {
        let pairs = df
            .get_column_names()
            .into_iter()
            .map(|name| (name.trim().to_string(), name.to_string()))
            .collect();
        Self { pairs }
    }

    fn trimmed(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(t, _)| t.as_str())
    }

    fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(t, _)| t == name)
    }

    fn original<'a>(&'a self, name: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(t, _)| t == name)
            .map(|(_, o)| o.as_str())
            .unwrap_or(name)
    }

    fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|r| !self.contains(r))
            .map(|r| r.to_string())
            .collect()
    }
}

/// Numeric column as `Option<f64>` per row (non-numeric cells become None)
fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let cast = df.column(name)?.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    let cast = df.column(name)?.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect())
}

fn optional_string_values(
    df: &DataFrame,
    columns: &ColumnNames,
    name: &str,
) -> PolarsResult<Vec<String>> {
    if columns.contains(name) {
        string_values(df, columns.original(name))
    } else {
        Ok(vec![String::new(); df.height()])
    }
}

/// `is_invasive` accepts booleans, 0/1 numbers and true/false strings
fn flag_values(df: &DataFrame, name: &str) -> std::result::Result<Vec<bool>, DatasetError> {
    let column = df.column(name)?;
    if !matches!(column.dtype(), DataType::String) {
        return Ok(f64_values(df, name)?
            .into_iter()
            .map(|v| v.is_some_and(|x| x != 0.0))
            .collect());
    }

    column
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let raw = value.unwrap_or("").trim();
            match raw.to_ascii_lowercase().as_str() {
                "" | "0" | "0.0" | "false" | "no" => Ok(false),
                "1" | "1.0" | "true" | "yes" => Ok(true),
                _ => Err(DatasetError::InvalidFlag { row, value: raw.to_string() }),
            }
        })
        .collect()
}

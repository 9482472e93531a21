//! SimilarityScorer: cosine similarity against the reference trait matrix
//!
//! Linear scan over every reference row. At a few thousand rows this beats
//! any index; a replacement index must keep the same contract (top-K by
//! cosine over a fixed-dimension dense matrix, ties in row order).

use crate::data::{FeatureSchema, ReferenceMatrix, ReferenceTraitRow};
use crate::pipeline::feature_profile::DynamicFeatureProfile;
use rayon::prelude::*;

/// Maximum number of scored rows returned
pub const TOP_N: usize = 50;

/// One reference row with its similarity to the query profile
#[derive(Debug, Clone, Copy)]
pub struct ScoredRow<'a> {
    pub row: &'a ReferenceTraitRow,
    /// Position in the reference matrix
    pub index: usize,
    pub score: f64,
}

/// Project a sparse profile into the schema's dense ordering
///
/// Lookup is by name; profile keys absent from the schema are dropped.
pub fn project(schema: &FeatureSchema, profile: &DynamicFeatureProfile) -> Vec<f64> {
    let mut dense = vec![0.0; schema.len()];
    for (name, value) in profile.iter() {
        match schema.position(name) {
            Some(idx) => dense[idx] = value,
            None => tracing::debug!("Profile feature '{}' not in reference schema", name),
        }
    }
    dense
}

/// Cosine similarity, 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    dot / denom
}

/// Score every row and return the top [`TOP_N`] by descending similarity
pub fn score<'a>(matrix: &'a ReferenceMatrix, profile: &DynamicFeatureProfile) -> Vec<ScoredRow<'a>> {
    score_top(matrix, profile, TOP_N)
}

/// Score every row and return the top `top_n`
///
/// Rows are scored in parallel; the collect keeps row order, and the
/// stable sort leaves score ties in row order.
pub fn score_top<'a>(
    matrix: &'a ReferenceMatrix,
    profile: &DynamicFeatureProfile,
    top_n: usize,
) -> Vec<ScoredRow<'a>> {
    let query = project(matrix.schema(), profile);

    let mut scored: Vec<ScoredRow<'a>> = matrix
        .rows()
        .par_iter()
        .enumerate()
        .map(|(index, row)| ScoredRow {
            row,
            index,
            score: cosine_similarity(&row.feature_vector, &query),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_n);
    scored
}

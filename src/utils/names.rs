//! Scientific name canonicalization
//!
//! Occurrence feeds, the static catalog and the reference trait matrix all
//! format names differently ("Rubus armeniacus (Focke)", "Rubus armeniacus",
//! "rubus armeniacus "). Every cross-source comparison goes through
//! [`canonicalize`] so the join key is computed in exactly one place.

/// Canonical join key for a scientific name
///
/// Steps:
/// 1. Drop everything from the first `(` (author / citation suffix)
/// 2. Trim surrounding whitespace
/// 3. Lowercase
///
/// Idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(name: &str) -> String {
    let without_author = match name.find('(') {
        Some(idx) => &name[..idx],
        None => name,
    };
    without_author.trim().to_lowercase()
}

//! Output naming for manifest and collection files.
//!
//! Every emitted document lands at `{output_dir}/{slug}.json` and is published
//! under a URL ending in the same `{slug}.json`. Slugs therefore have to be:
//!
//! - **stable**: a function of the file name only, so re-running the generator
//!   never moves a URL;
//! - **safe**: usable both as a filename and as a URL path segment;
//! - **unique** within one output directory.
//!
//! ## Derivation
//!
//! Manifests are named after the full file name, extension included, so a
//! manifest URL depends on nothing but its own file:
//!
//! ```text
//! 001-dawn.jpg           → 001-dawn.jpg
//! Saint Jerome (2).png   → Saint-Jerome-2.png
//! 日本.jpg               → {sha256 prefix}.jpg  (nothing survives sanitizing)
//! ```
//!
//! Collections are named after a group value:
//!
//! ```text
//! train                  → train
//! 11H(JEROME)            → 11H-JEROME
//! ```
//!
//! Collection slugs never contain a dot and manifest slugs always do, so the
//! two can only collide with their own kind. Two files whose names sanitize
//! alike (`a b.jpg`, `a-b.jpg`) are reported as an output collision rather
//! than renamed.

use sha2::{Digest, Sha256};
use std::path::Path;

const MAX_SLUG_LEN: usize = 80;
const HASH_LEN: usize = 8;

/// Sanitize a name for use in URLs and filenames.
///
/// - Keeps ASCII alphanumerics, `-` and `_`; everything else becomes a dash
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
/// - Truncates to `MAX_SLUG_LEN` characters (breaks at last dash before limit)
pub fn sanitize_slug(name: &str) -> String {
    let mut collapsed = String::with_capacity(name.len());
    let mut prev_dash = false;
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        // Only ASCII survives the mapping above, so byte slicing is safe.
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

/// First `HASH_LEN` hex characters of the SHA-256 of `key`.
pub fn short_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..HASH_LEN].to_string()
}

/// Slug for a single name, falling back to a hash when sanitizing leaves nothing.
pub fn slug_or_hash(name: &str, key: &str) -> String {
    let slug = sanitize_slug(name);
    if slug.is_empty() { short_hash(key) } else { slug }
}

/// Slug of an image file: sanitized stem plus sanitized extension.
///
/// Depends only on `filename`. A stem that sanitizes to nothing is replaced
/// by a hash of the whole file name.
pub fn file_slug(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let stem = slug_or_hash(&stem, filename);
    match path.extension().map(|e| sanitize_slug(&e.to_string_lossy())) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem,
    }
}

//! CLI output formatting.
//!
//! Output is **document-centric**: every line leads with what was produced
//! (a manifest's label, a collection's name) and points at the file it went
//! to. Source files and counts are indented context underneath.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Manifests
//! 001 a → a.jpg.json
//!     Source: a.jpg (100×200)
//! 002 b → b.png.json
//!     Source: b.png (50×50)
//!
//! Collections
//! 001 train (2 images) → train.json
//! 002 index (2 items) → index.json
//!
//! Generated 2 manifests, 2 collections → out/collections
//! Skipped 1 image
//!
//! Example URLs
//!     Image info:  http://localhost:8182/iiif/3/a.jpg/info.json
//!     ...
//! ```
//!
//! ## Check
//!
//! Same listing, ending in what *would* be written instead.
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Diagnostics go through `log`
//! to stderr, never through here.

use crate::generate::{GenerateReport, Generation};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// First value of a single-language map, whatever the language.
fn first_label(map: &crate::presentation::LanguageMap) -> &str {
    map.values()
        .next()
        .and_then(|v| v.first())
        .map(String::as_str)
        .unwrap_or("")
}

/// Manifest and collection listing shared by generate and check.
fn format_documents(generation: &Generation) -> Vec<String> {
    let mut lines = vec!["Manifests".to_string()];
    for (i, record) in generation.records.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}.json",
            format_index(i + 1),
            record.file.stem,
            record.file.slug
        ));
        let source = match &record.file.directory {
            Some(dir) => format!("{dir}/{}", record.file.filename),
            None => record.file.filename.clone(),
        };
        lines.push(format!(
            "    Source: {} ({}×{})",
            source, record.width, record.height
        ));
    }

    lines.push(String::new());
    lines.push("Collections".to_string());
    for (i, named) in generation.collections.iter().enumerate() {
        let items = &named.collection.items;
        let all_manifests = items.iter().all(|r| r.kind == "Manifest");
        let size = if all_manifests {
            count(items.len(), "image", "images")
        } else {
            count(items.len(), "item", "items")
        };
        lines.push(format!(
            "{} {} ({}) → {}.json",
            format_index(i + 1),
            first_label(&named.collection.label),
            size,
            named.slug
        ));
    }
    lines
}

fn format_skipped(generation: &Generation, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if generation.skipped.is_empty() {
        return lines;
    }
    lines.push(format!(
        "Skipped {}",
        count(generation.skipped.len(), "image", "images")
    ));
    if verbose {
        for skip in &generation.skipped {
            lines.push(format!("    {}: {}", skip.filename, skip.reason));
        }
    }
    lines
}

// ============================================================================
// generate
// ============================================================================

/// Format the result of a `generate` run.
///
/// Unreadable images are counted; with `verbose` each is listed with its reason.
pub fn format_generate_output(report: &GenerateReport, verbose: bool) -> Vec<String> {
    let generation = &report.generation;
    let mut lines = format_documents(generation);
    lines.push(String::new());
    lines.push(format!(
        "Generated {}, {} → {}",
        count(generation.manifests.len(), "manifest", "manifests"),
        count(generation.collections.len(), "collection", "collections"),
        report.output_dir.display()
    ));
    lines.extend(format_skipped(generation, verbose));
    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(report: &GenerateReport, verbose: bool) {
    for line in format_generate_output(report, verbose) {
        println!("{}", line);
    }
}

/// Format example URLs for the first generated image.
///
/// Image URLs are taken from the first manifest as written, so they follow the
/// configured delivery format and thumbnail size. The thumbnail line is left
/// out when thumbnails are disabled.
///
/// ```text
/// Example URLs
///     Image info:  {service}/info.json
///     Full image:  {painting body id}
///     Thumbnail:   {thumbnail id}
///     Manifest:    {manifest_url}/{slug}.json
///     Collection:  {manifest_url}/{index_name}.json
/// ```
pub fn format_example_urls(generation: &Generation) -> Vec<String> {
    let (Some(record), Some(manifest)) = (generation.records.first(), generation.manifests.first())
    else {
        return Vec::new();
    };
    let body = manifest
        .items
        .first()
        .and_then(|canvas| canvas.items.first())
        .and_then(|page| page.items.first())
        .map(|annotation| &annotation.body);

    let mut lines = vec![
        "Example URLs".to_string(),
        format!("    Image info:  {}/info.json", record.identifier),
    ];
    if let Some(body) = body {
        lines.push(format!("    Full image:  {}", body.id));
    }
    if let Some(thumbnail) = manifest.thumbnail.first() {
        lines.push(format!("    Thumbnail:   {}", thumbnail.id));
    }
    lines.push(format!("    Manifest:    {}", manifest.id));
    lines.push(format!("    Collection:  {}", generation.collections.index.collection.id));
    lines
}

/// Print example URLs to stdout.
pub fn print_example_urls(generation: &Generation) {
    let lines = format_example_urls(generation);
    if lines.is_empty() {
        return;
    }
    println!();
    for line in lines {
        println!("{}", line);
    }
}

/// Format the notice shown when `generate` finds earlier output and `--force` is off.
pub fn format_existing_notice(output_dir: &Path, existing: &[PathBuf]) -> Vec<String> {
    vec![
        format!(
            "{} already contains {}; nothing written",
            output_dir.display(),
            count(existing.len(), "JSON file", "JSON files")
        ),
        "Use --force to regenerate".to_string(),
    ]
}

/// Print the existing-output notice to stdout.
pub fn print_existing_notice(output_dir: &Path, existing: &[PathBuf]) {
    for line in format_existing_notice(output_dir, existing) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

/// Format the result of a `check` run: what `generate` would write.
pub fn format_check_output(generation: &Generation, output_dir: &Path, verbose: bool) -> Vec<String> {
    let mut lines = format_documents(generation);
    if !generation.unmatched_rows.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Unmatched metadata: {}",
            count(generation.unmatched_rows.len(), "row", "rows")
        ));
        if verbose {
            for key in &generation.unmatched_rows {
                lines.push(format!("    {key}"));
            }
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Would write {}, {} → {}",
        count(generation.manifests.len(), "manifest", "manifests"),
        count(generation.collections.len(), "collection", "collections"),
        output_dir.display()
    ));
    lines.extend(format_skipped(generation, verbose));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(generation: &Generation, output_dir: &Path, verbose: bool) {
    for line in format_check_output(generation, output_dir, verbose) {
        println!("{}", line);
    }
}

//! Generation pipeline: scan, join metadata, identify, build, write.
//!
//! ```text
//! images_dir ──scan──▶ ImageFile ──identify──▶ ImageRecord ──▶ Manifest ──┐
//!                                    ▲                                    ├──▶ output_dir/*.json
//! metadata.csv ──load──▶ MetadataTable                      Collection ──┘
//! ```
//!
//! [`prepare`] does everything except writing and is what `check` runs.
//! [`generate`] prepares and then writes. [`check_inputs`] stops after the
//! configuration, scan and metadata steps.
//!
//! ## Failure handling
//!
//! Configuration problems (bad URLs, missing directory, no images, a CSV
//! without its key column, output names that would overwrite each other)
//! stop the run before anything is written. An image whose dimensions cannot
//! be read is skipped: it is logged, counted, and left out of every document.
//! Only when *every* image is skipped does the run fail.
//!
//! ## Determinism
//!
//! Identification runs on rayon's pool but results are collected in scan
//! order, and nothing in the documents depends on time or scheduling.
//! Running twice on the same inputs writes byte-identical files.

use crate::collection::{Collections, build_collections};
use crate::config::{ConfigError, GeneratorConfig};
use crate::imaging::{ImageBackend, supported_input_extensions};
use crate::manifest::{ImageRecord, UrlScheme, build_manifest};
use crate::metadata::{MetadataError, MetadataTable};
use crate::presentation::{Manifest, to_json};
use crate::scan::{ScanError, scan};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no manifests generated: all {skipped} images could not be read")]
    NothingGenerated { skipped: usize },
    #[error("output name collision: {first} and {second} would both be written to {file}")]
    OutputCollision {
        file: String,
        first: String,
        second: String,
    },
}

impl GenerateError {
    /// Process exit code for this error.
    ///
    /// `2` configuration, `3` metadata, `4` nothing generated, `1` I/O.
    pub fn exit_code(&self) -> u8 {
        match self {
            GenerateError::Config(ConfigError::Io(_))
            | GenerateError::Scan(ScanError::Io(_) | ScanError::Walk(_)) => 1,
            GenerateError::Config(_)
            | GenerateError::Scan(_)
            | GenerateError::OutputCollision { .. } => 2,
            GenerateError::Metadata(_) => 3,
            GenerateError::NothingGenerated { .. } => 4,
            GenerateError::Io(_) | GenerateError::Write { .. } | GenerateError::Json(_) => 1,
        }
    }
}

/// An image left out of the output because its dimensions could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub filename: String,
    pub reason: String,
}

/// Everything a run would write, held in memory.
#[derive(Debug)]
pub struct Generation {
    /// Identified images in scan order.
    pub records: Vec<ImageRecord>,
    /// `manifests[i]` is built from `records[i]`.
    pub manifests: Vec<Manifest>,
    pub collections: Collections,
    pub skipped: Vec<SkippedImage>,
    /// Keys of metadata rows that matched no image.
    pub unmatched_rows: Vec<String>,
}

impl Generation {
    /// `(file name, document)` pairs in write order: manifests, then collections.
    pub fn documents(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let manifests = self
            .records
            .iter()
            .zip(&self.manifests)
            .map(|(record, manifest)| {
                to_json(manifest).map(|json| (format!("{}.json", record.file.slug), json))
            });
        let collections = self
            .collections
            .iter()
            .map(|named| {
                to_json(&named.collection).map(|json| (format!("{}.json", named.slug), json))
            });
        manifests.chain(collections).collect()
    }
}

/// Result of a completed `generate` run.
#[derive(Debug)]
pub struct GenerateReport {
    pub generation: Generation,
    pub output_dir: PathBuf,
    /// Paths written, in write order.
    pub written: Vec<PathBuf>,
}

/// Run the pipeline up to, but not including, writing.
pub fn prepare(
    config: &GeneratorConfig,
    backend: &impl ImageBackend,
) -> Result<Generation, GenerateError> {
    config.validate()?;
    let urls = UrlScheme::from_config(config)?;
    let extensions = config.normalized_extensions();
    warn_unsupported(&extensions);

    // 1. Scan
    let files = scan(&config.images_dir, &extensions, config.recursive)?;
    log::info!("found {} images in {}", files.len(), config.images_dir.display());

    // 2. Metadata
    let table = match &config.metadata_file {
        Some(path) => {
            let table = MetadataTable::load(path, &config.metadata.key_column)?;
            log::info!("loaded {} metadata rows from {}", table.len(), path.display());
            Some(table)
        }
        None => None,
    };
    let unmatched_rows: Vec<String> = table
        .as_ref()
        .map(|t| {
            t.unmatched(files.iter().map(|f| (f.filename.as_str(), f.stem.as_str())))
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    for key in &unmatched_rows {
        log::debug!("metadata row '{key}' matches no image, ignored");
    }

    // 3. Identify
    let scanned = files.len();
    let include_empty = config.metadata.include_empty;
    let outcomes: Vec<Result<ImageRecord, SkippedImage>> = files
        .into_par_iter()
        .map(|file| match backend.identify(&file.path) {
            Ok(dimensions) => {
                let row = table
                    .as_ref()
                    .and_then(|t| t.lookup(&file.filename, &file.stem));
                Ok(ImageRecord::new(file, dimensions, row, &urls, include_empty))
            }
            Err(e) => {
                log::info!("skipping {}: {}", file.filename, e);
                Err(SkippedImage {
                    filename: file.filename,
                    reason: e.to_string(),
                })
            }
        })
        .collect();

    let mut records = Vec::with_capacity(scanned);
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(skip) => skipped.push(skip),
        }
    }
    if records.is_empty() {
        return Err(GenerateError::NothingGenerated { skipped: skipped.len() });
    }

    // 4. Build
    let manifests: Vec<Manifest> = records
        .iter()
        .map(|r| build_manifest(r, &urls, &config.presentation))
        .collect();
    let collections = build_collections(&records, &manifests, config, &urls);

    let generation = Generation {
        records,
        manifests,
        collections,
        skipped,
        unmatched_rows,
    };
    check_output_names(&generation)?;
    Ok(generation)
}

/// Run the full pipeline and write every document to `config.output_dir`.
pub fn generate(
    config: &GeneratorConfig,
    backend: &impl ImageBackend,
) -> Result<GenerateReport, GenerateError> {
    let generation = prepare(config, backend)?;
    let documents = generation.documents()?;

    let output_dir = config.output_dir.clone();
    fs::create_dir_all(&output_dir).map_err(|source| GenerateError::Write {
        path: output_dir.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(documents.len());
    for (name, json) in documents {
        let path = output_dir.join(name);
        fs::write(&path, json).map_err(|source| GenerateError::Write {
            path: path.clone(),
            source,
        })?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }

    Ok(GenerateReport {
        generation,
        output_dir,
        written,
    })
}

/// Check configuration, images directory and metadata file without
/// identifying any image. Fails with the same errors [`prepare`] would.
pub fn check_inputs(config: &GeneratorConfig) -> Result<(), GenerateError> {
    config.validate()?;
    UrlScheme::from_config(config)?;
    scan(&config.images_dir, &config.normalized_extensions(), config.recursive)?;
    if let Some(path) = &config.metadata_file {
        MetadataTable::load(path, &config.metadata.key_column)?;
    }
    Ok(())
}

/// JSON files already present in `output_dir`, sorted. A missing directory has none.
pub fn existing_outputs(output_dir: &Path) -> Result<Vec<PathBuf>, GenerateError> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Fail if two documents would be written to the same file.
fn check_output_names(generation: &Generation) -> Result<(), GenerateError> {
    let mut owners: HashMap<String, String> = HashMap::new();
    let manifests = generation
        .records
        .iter()
        .map(|r| (r.file.slug.as_str(), format!("manifest for {}", r.file.filename)));
    let collections = generation
        .collections
        .iter()
        .map(|c| (c.slug.as_str(), format!("collection '{}'", c.slug)));

    for (slug, owner) in manifests.chain(collections) {
        let file = format!("{slug}.json");
        if let Some(first) = owners.get(&file) {
            return Err(GenerateError::OutputCollision {
                file,
                first: first.clone(),
                second: owner,
            });
        }
        owners.insert(file, owner);
    }
    Ok(())
}

fn warn_unsupported(extensions: &[String]) {
    let supported = supported_input_extensions();
    for ext in extensions {
        if !supported.contains(&ext.as_str()) {
            log::warn!("no decoder for '.{ext}' files; they will be skipped");
        }
    }
}

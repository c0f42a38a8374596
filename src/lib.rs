//! # iiif-gen
//!
//! Generates static IIIF Presentation API 3.0 documents for a directory of
//! images. Pixels are served by an external IIIF image server; this crate
//! only writes the JSON that viewers load: one Manifest per image, one
//! Collection per group, and a top-level index Collection.
//!
//! # Architecture: Pipeline
//!
//! ```text
//! 1. Scan        images_dir    →  ImageFile      (discover, name)
//! 2. Metadata    metadata.csv  →  MetadataTable  (optional)
//! 3. Identify    ImageFile     →  ImageRecord    (pixel dimensions; failures skipped)
//! 4. Build       ImageRecord   →  Manifest, Collection
//! 5. Write       documents     →  output_dir/*.json
//! ```
//!
//! Building is pure: [`manifest`] and [`collection`] take in-memory records
//! and return documents, so unit tests exercise the IIIF shape without
//! touching the filesystem or decoding images.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the images directory, filters by extension, assigns slugs |
//! | [`metadata`] | CSV metadata keyed by file name (or stem) |
//! | [`imaging`] | Header-only dimension reading behind the [`imaging::ImageBackend`] trait |
//! | [`manifest`] | URL scheme, [`manifest::ImageRecord`], one Manifest per image |
//! | [`collection`] | Groupings, sample and index Collections |
//! | [`presentation`] | Serde types for the emitted IIIF documents |
//! | [`generate`] | Orchestrates the pipeline and writes the output |
//! | [`config`] | Layered `iiif-gen.toml` / environment / flag configuration |
//! | [`naming`] | Slug derivation and collision handling |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Identifiers From File Names
//!
//! The image server resolves `{base_url}/iiif/3/{filename}` by looking up the
//! file name in its own source directory, so the file name is the identifier.
//! Manifest URLs use a slug of the file stem instead, because they double as
//! file names in `output_dir`. Both are pure functions of the file name: the
//! same image keeps the same URLs across runs.
//!
//! ## Skip, Don't Abort
//!
//! A single unreadable image should not cost the other ten thousand their
//! manifests. Read failures are per item; configuration failures are fatal
//! before any work starts.
//!
//! ## Static Output
//!
//! Everything is written once, as files. Serving is left to any static file
//! server, so the documents outlive the tool that made them.

pub mod collection;
pub mod config;
pub mod generate;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod presentation;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;

//! Image discovery.
//!
//! Stage 1 of the generator. Walks the images directory, keeps files whose
//! extension is accepted, and assigns each one the slug its manifest will be
//! written under.
//!
//! ## Directory Structure
//!
//! ```text
//! data/images/                 # images_dir
//! ├── a.jpg                    # → ImageFile { filename: "a.jpg", directory: None }
//! ├── b.PNG                    # extensions match case-insensitively
//! ├── notes.txt                # not an accepted extension: skipped
//! ├── .DS_Store                # hidden: skipped
//! └── saints/                  # only visited with recursive = true
//!     └── c.tif                # → directory: Some("saints")
//! ```
//!
//! ## Identity
//!
//! The file name is the identifier the image server resolves
//! (`{base_url}/iiif/3/{filename}`), so it must be unique across the whole
//! scan. Two files with the same name in different subdirectories are an
//! error rather than a silent overwrite.
//!
//! Only extensions are checked here; whether the bytes are a readable image is
//! decided later, per file, by the identify step.

use crate::imaging::media_type_for;
use crate::naming;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot read images directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("images directory not found: {0}")]
    NotFound(PathBuf),
    #[error("images path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("no image files ({extensions}) found in {dir}")]
    NoImages { dir: PathBuf, extensions: String },
    #[error("duplicate file name '{filename}': {} and {}", .first.display(), .second.display())]
    DuplicateFilename {
        filename: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A discovered image file, before its dimensions are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// File name with extension; the image server identifier.
    pub filename: String,
    /// File name without its final extension.
    pub stem: String,
    pub path: PathBuf,
    /// Subdirectory relative to the images root, `/`-separated. `None` at top level.
    pub directory: Option<String>,
    /// Media type derived from the extension.
    pub media_type: String,
    /// Output name derived from the file name: manifests are written to `{slug}.json`.
    pub slug: String,
}

/// Discover image files under `root`.
///
/// `extensions` must already be normalized (lowercase, no dot). Results are
/// sorted by file name.
pub fn scan(root: &Path, extensions: &[String], recursive: bool) -> Result<Vec<ImageFile>, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    let mut files: Vec<ImageFile> = Vec::new();
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !has_extension(path, extensions) {
            continue;
        }
        let Some(filename) = entry.file_name().to_str() else {
            log::warn!("skipping {}: file name is not valid UTF-8", path.display());
            continue;
        };
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let directory = path
            .parent()
            .and_then(|p| p.strip_prefix(root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            });

        files.push(ImageFile {
            filename: filename.to_string(),
            stem,
            path: path.to_path_buf(),
            directory,
            media_type: media_type_for(path),
            slug: naming::file_slug(filename),
        });
    }

    if files.is_empty() {
        return Err(ScanError::NoImages {
            dir: root.to_path_buf(),
            extensions: extensions.join(", "),
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename).then_with(|| a.path.cmp(&b.path)));
    check_unique_filenames(&files)?;
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|accepted| *accepted == ext))
}

fn check_unique_filenames(files: &[ImageFile]) -> Result<(), ScanError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for file in files {
        if let Some(first) = seen.insert(&file.filename, &file.path) {
            return Err(ScanError::DuplicateFilename {
                filename: file.filename.clone(),
                first: first.to_path_buf(),
                second: file.path.clone(),
            });
        }
    }
    Ok(())
}

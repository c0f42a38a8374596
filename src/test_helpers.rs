//! Shared test utilities.
//!
//! Real images are tiny solid-colour files encoded with the `image` crate, so
//! tests exercise the actual header decoders without binary fixtures in the
//! repository. Where dimensions are all that matter, prefer
//! [`MockBackend`](crate::imaging::backend::tests::MockBackend) and plain
//! placeholder files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_jpeg(&tmp.path().join("a.jpg"), 100, 200);
//! let manifest = read_json(&out.join("a.jpg.json"));
//! assert_eq!(manifest["items"][0]["width"], 100);
//! ```

use crate::imaging::media_type_for;
use crate::naming::file_slug;
use crate::scan::ImageFile;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Image files
// =========================================================================

fn solid(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([120, 90, 60]))
}

/// Write a JPEG of the given size.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    solid(width, height)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
}

/// Write a PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    solid(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
}

// =========================================================================
// In-memory fixtures
// =========================================================================

/// An `ImageFile` as a flat scan of `/images` would produce it.
pub fn image_file(filename: &str) -> ImageFile {
    let path = PathBuf::from("/images").join(filename);
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    ImageFile {
        filename: filename.to_string(),
        slug: file_slug(filename),
        stem,
        media_type: media_type_for(&path),
        path,
        directory: None,
    }
}

// =========================================================================
// Output inspection
// =========================================================================

/// Parse a written JSON document. Panics with the path on failure.
pub fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
}

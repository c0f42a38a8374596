//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between the generator and whatever
//! reads image headers. Production code uses
//! [`RustBackend`](super::rust_backend::RustBackend); tests use the
//! [`MockBackend`](tests::MockBackend) below to script successes and failures
//! without writing real image files.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single image could not be identified.
///
/// This error is recovered from: the generator logs it, counts the item as
/// skipped, and moves on to the next image.
#[derive(Error, Debug)]
pub enum ImageReadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read dimensions of {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("image {path} has zero width or height")]
    Empty { path: PathBuf },
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image identification backends.
///
/// `Sync` so identification can run on rayon's pool.
pub trait ImageBackend: Sync {
    /// Read the pixel dimensions of the image at `path`.
    fn identify(&self, path: &Path) -> Result<Dimensions, ImageReadError>;
}

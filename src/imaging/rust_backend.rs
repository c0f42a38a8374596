//! Pure Rust identification backend built on the `image` crate.
//!
//! Only the header is parsed: `ImageReader::into_dimensions` stops as soon as
//! the decoder knows the size, so identifying a 100 MB TIFF costs a few reads.
//! The format is guessed from the file contents first and the extension
//! second, which lets a mislabelled PNG named `.jpg` still be identified.

use super::backend::{Dimensions, ImageBackend, ImageReadError};
use image::{ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions the generator knows how to identify, if the decoder is compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Media type of an image, derived from its extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn media_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Backend using the `image` crate's header decoders.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, ImageReadError> {
        let io_err = |source| ImageReadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ImageReadError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if width == 0 || height == 0 {
            return Err(ImageReadError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Dimensions { width, height })
    }
}

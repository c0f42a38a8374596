//! Image identification: reading pixel dimensions, nothing else.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header-only read) |
//! | **Media type** | `mime_guess` on the file extension |
//!
//! Pixels are served by the external image server; the generator only needs
//! width and height to size each canvas. The module is split into:
//! - **Backend**: [`ImageBackend`] trait, [`Dimensions`], [`ImageReadError`]
//! - **Rust backend**: [`RustBackend`], the production implementation

pub mod backend;
pub mod rust_backend;

pub use backend::{Dimensions, ImageBackend, ImageReadError};
pub use rust_backend::{RustBackend, media_type_for, supported_input_extensions};

//! Manifest construction.
//!
//! Turns one identified image into one IIIF Manifest. Everything here is pure:
//! no filesystem access, no clock, no randomness. The same record and
//! configuration always produce the same document, which is what makes
//! re-runs byte-identical.
//!
//! ## URL scheme
//!
//! Two base URLs are involved. The image server's, for pixels:
//!
//! ```text
//! {base_url}/iiif/3/{filename}                         image service
//! {base_url}/iiif/3/{filename}/full/max/0/default.jpg  painting body
//! {base_url}/iiif/3/{filename}/full/!200,200/0/default.jpg  thumbnail
//! ```
//!
//! and the static file server's, for the documents this crate writes:
//!
//! ```text
//! {manifest_url}/{slug}.json                 manifest id
//! {manifest_url}/{slug}/canvas/1             canvas id
//! {manifest_url}/{slug}/page/1               annotation page id
//! {manifest_url}/{slug}/annotation/1         annotation id
//! ```
//!
//! File names and slugs are percent-encoded as single path segments, so a
//! file called `a b/c.jpg` can never escape its segment.

use crate::config::{ConfigError, DeliveryFormat, GeneratorConfig, PresentationConfig};
use crate::imaging::Dimensions;
use crate::metadata::{MetadataField, MetadataRow, manifest_fields};
use crate::presentation::{
    Annotation, AnnotationPage, Canvas, ImageResource, ImageService, LanguageMap, Manifest,
    MetadataEntry, PRESENTATION_CONTEXT, language_map,
};
use crate::scan::ImageFile;
use url::Url;

/// Base URLs for everything the generator references.
#[derive(Debug, Clone)]
pub struct UrlScheme {
    image_base: Url,
    document_base: Url,
}

impl UrlScheme {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            image_base: config.image_base_url()?,
            document_base: config.manifest_base_url()?,
        })
    }

    /// `{base_url}/iiif/3/{filename}`: the image's identifier on the image server.
    pub fn image_service(&self, filename: &str) -> String {
        join(&self.image_base, &["iiif", "3", filename])
    }

    /// `{manifest_url}/{slug}.json`: where a written document is published.
    pub fn document(&self, slug: &str) -> String {
        join(&self.document_base, &[&format!("{slug}.json")])
    }

    /// `{manifest_url}/{slug}/{kind}/{index}` for canvases, pages and annotations.
    pub fn resource(&self, slug: &str, kind: &str, index: usize) -> String {
        join(&self.document_base, &[slug, kind, &index.to_string()])
    }
}

fn join(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();
    // Bases are validated as http(s) URLs, which always have a path.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.to_string()
}

/// An image whose dimensions are known, with its metadata merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub file: ImageFile,
    /// Image service URL; unique and derived only from the base URL and file name.
    pub identifier: String,
    pub width: u32,
    pub height: u32,
    /// Label/value pairs emitted on the manifest.
    pub metadata: Vec<MetadataField>,
    /// The full CSV row, empty values included, used for grouping.
    pub row: Option<MetadataRow>,
}

impl ImageRecord {
    pub fn new(
        file: ImageFile,
        dimensions: Dimensions,
        row: Option<&MetadataRow>,
        urls: &UrlScheme,
        include_empty: bool,
    ) -> Self {
        Self {
            identifier: urls.image_service(&file.filename),
            width: dimensions.width,
            height: dimensions.height,
            metadata: manifest_fields(row, include_empty),
            row: row.cloned(),
            file,
        }
    }

    /// Value of a metadata column for this image, if present and non-empty.
    pub fn column(&self, column: &str) -> Option<&str> {
        self.row
            .as_ref()
            .and_then(|r| r.get(column))
            .filter(|v| !v.is_empty())
    }
}

/// Extension and media type requested from the image server.
fn delivery(format: DeliveryFormat, source_media_type: &str) -> (&'static str, &'static str) {
    const JPG: (&str, &str) = ("jpg", "image/jpeg");
    match format {
        DeliveryFormat::Jpg => JPG,
        DeliveryFormat::Png => ("png", "image/png"),
        DeliveryFormat::Source => match source_media_type {
            "image/png" => ("png", "image/png"),
            "image/tiff" => ("tif", "image/tiff"),
            "image/webp" => ("webp", "image/webp"),
            "image/gif" => ("gif", "image/gif"),
            _ => JPG,
        },
    }
}

/// Size of a `!n,n` thumbnail: fit inside an n×n box, never upscaled.
pub fn thumbnail_dimensions(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width <= bound && height <= bound {
        return (width, height);
    }
    let scale = |side: u32, long: u32| -> u32 {
        let scaled = (side as u64 * bound as u64 + long as u64 / 2) / long as u64;
        scaled.max(1) as u32
    };
    if width >= height {
        (bound, scale(height, width))
    } else {
        (scale(width, height), bound)
    }
}

fn metadata_entries(fields: &[MetadataField], language: &str) -> Vec<MetadataEntry> {
    fields
        .iter()
        .map(|f| MetadataEntry {
            label: language_map(language, f.label.as_str()),
            value: language_map(language, f.value.as_str()),
        })
        .collect()
}

/// Build the manifest for one image: a single canvas painted with the image.
pub fn build_manifest(
    record: &ImageRecord,
    urls: &UrlScheme,
    presentation: &PresentationConfig,
) -> Manifest {
    let lang = presentation.language.as_str();
    let slug = record.file.slug.as_str();
    let label: LanguageMap = language_map(lang, record.file.stem.as_str());
    let canvas_id = urls.resource(slug, "canvas", 1);
    let (ext, format) = delivery(presentation.delivery_format, &record.file.media_type);

    let body = ImageResource {
        id: format!("{}/full/max/0/default.{}", record.identifier, ext),
        kind: "Image".to_string(),
        format: format.to_string(),
        height: Some(record.height),
        width: Some(record.width),
        service: vec![ImageService {
            id: record.identifier.clone(),
            kind: "ImageService3".to_string(),
            profile: presentation.image_profile.clone(),
        }],
    };

    let thumbnail = if presentation.thumbnail_size > 0 {
        let n = presentation.thumbnail_size;
        let (width, height) = thumbnail_dimensions(record.width, record.height, n);
        vec![ImageResource {
            id: format!("{}/full/!{n},{n}/0/default.jpg", record.identifier),
            kind: "Image".to_string(),
            format: "image/jpeg".to_string(),
            height: Some(height),
            width: Some(width),
            service: vec![],
        }]
    } else {
        vec![]
    };

    let canvas = Canvas {
        id: canvas_id.clone(),
        kind: "Canvas".to_string(),
        label: label.clone(),
        height: record.height,
        width: record.width,
        items: vec![AnnotationPage {
            id: urls.resource(slug, "page", 1),
            kind: "AnnotationPage".to_string(),
            items: vec![Annotation {
                id: urls.resource(slug, "annotation", 1),
                kind: "Annotation".to_string(),
                motivation: "painting".to_string(),
                body,
                target: canvas_id,
            }],
        }],
    };

    Manifest {
        context: PRESENTATION_CONTEXT.to_string(),
        id: urls.document(slug),
        kind: "Manifest".to_string(),
        label,
        summary: None,
        metadata: metadata_entries(&record.metadata, lang),
        thumbnail,
        items: vec![canvas],
    }
}

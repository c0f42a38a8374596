//! IIIF Presentation API 3.0 document shapes.
//!
//! Only the subset the generator emits is modelled: `Manifest`, `Canvas`,
//! `AnnotationPage`, `Annotation`, an `Image` body with an `ImageService3`,
//! and `Collection` with its item references.
//!
//! JSON key order follows struct field order, so serialising the same value
//! twice yields identical bytes. Language maps are `BTreeMap`s for the same
//! reason.
//!
//! See <https://iiif.io/api/presentation/3.0/>.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";

/// A IIIF language map: `{"en": ["value"]}`.
pub type LanguageMap = BTreeMap<String, Vec<String>>;

/// Build a language map holding a single value.
pub fn language_map(language: &str, value: impl Into<String>) -> LanguageMap {
    BTreeMap::from([(language.to_string(), vec![value.into()])])
}

/// One entry of a `metadata` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: LanguageMap,
    pub value: LanguageMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LanguageMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<ImageResource>,
    pub items: Vec<Canvas>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    pub height: u32,
    pub width: u32,
    pub items: Vec<AnnotationPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub motivation: String,
    pub body: ImageResource,
    pub target: String,
}

/// An `Image` content resource, used for painting bodies and thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<ImageService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageService {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LanguageMap>,
    pub items: Vec<Reference>,
}

/// A reference from a collection to a manifest or a nested collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
}

impl Reference {
    pub fn to_manifest(manifest: &Manifest) -> Self {
        Self {
            id: manifest.id.clone(),
            kind: "Manifest".to_string(),
            label: manifest.label.clone(),
        }
    }

    pub fn to_collection(collection: &Collection) -> Self {
        Self {
            id: collection.id.clone(),
            kind: "Collection".to_string(),
            label: collection.label.clone(),
        }
    }
}

/// Serialise a document the way it is written to disk: pretty JSON plus a
/// trailing newline.
pub fn to_json<T: Serialize>(document: &T) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    Ok(json)
}

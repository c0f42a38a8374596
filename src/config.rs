//! Generator configuration.
//!
//! Configuration is layered. Each layer only needs the keys it wants to
//! override:
//!
//! ```text
//! stock defaults                 (GeneratorConfig::default)
//!   ← iiif-gen.toml              (./iiif-gen.toml, or --config <path>)
//!     ← environment variables    (IMAGES_DIR, IIIF_BASE_URL, ...)
//!       ← command-line flags
//! ```
//!
//! Environment variables and flags are resolved together by clap into an
//! [`Overrides`] value, which is merged last. The merge itself works on
//! `toml::Value` trees ([`merge_toml`]) so partial files behave the same as
//! partial overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! images_dir = "data/images"
//! output_dir = "out/collections"
//! base_url = "http://localhost:8182"              # IIIF image server
//! manifest_url = "http://localhost:8080/collections"  # where output_dir is served
//! # metadata_file = "data/metadata.csv"
//! extensions = ["jpg", "jpeg", "png", "tif", "tiff"]
//! recursive = false
//!
//! [metadata]
//! key_column = "filename"
//! include_empty = true
//!
//! [presentation]
//! language = "en"
//! delivery_format = "jpg"   # jpg | png | source
//! image_profile = "level2"
//! thumbnail_size = 200      # 0 = no thumbnails
//! index_name = "index"
//! index_label = "All images"
//!
//! [sample]
//! size = 0                  # 0 = no sample collection
//!
//! [processing]
//! max_processes = 4         # omit for auto = CPU cores
//!
//! [[grouping]]
//! by = "column"             # column | prefix | directory | flags
//! column = "set"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Config file picked up from the working directory when `--config` is absent.
pub const CONFIG_FILENAME: &str = "iiif-gen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Generator configuration.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Directory scanned for images.
    pub images_dir: PathBuf,
    /// Directory the JSON documents are written to.
    pub output_dir: PathBuf,
    /// Base URL of the IIIF image server.
    pub base_url: String,
    /// URL under which `output_dir` is published.
    pub manifest_url: String,
    /// Optional CSV with per-image metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,
    /// Accepted image extensions (case-insensitive, leading dot optional).
    pub extensions: Vec<String>,
    /// Descend into subdirectories of `images_dir`.
    pub recursive: bool,
    pub metadata: MetadataConfig,
    pub presentation: PresentationConfig,
    pub sample: SampleConfig,
    pub processing: ProcessingConfig,
    /// Collection groupings, applied in order.
    pub grouping: Vec<Grouping>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("data/images"),
            output_dir: PathBuf::from("out/collections"),
            base_url: "http://localhost:8182".to_string(),
            manifest_url: "http://localhost:8080/collections".to_string(),
            metadata_file: None,
            extensions: ["jpg", "jpeg", "png", "tif", "tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            recursive: false,
            metadata: MetadataConfig::default(),
            presentation: PresentationConfig::default(),
            sample: SampleConfig::default(),
            processing: ProcessingConfig::default(),
            grouping: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Validate config values before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_base_url("base_url", &self.base_url)?;
        parse_base_url("manifest_url", &self.manifest_url)?;

        if self.normalized_extensions().is_empty() {
            return Err(ConfigError::Validation(
                "extensions must not be empty".into(),
            ));
        }
        if self.metadata.key_column.trim().is_empty() {
            return Err(ConfigError::Validation(
                "metadata.key_column must not be empty".into(),
            ));
        }
        if self.presentation.language.trim().is_empty() {
            return Err(ConfigError::Validation(
                "presentation.language must not be empty".into(),
            ));
        }
        let index_name = &self.presentation.index_name;
        if index_name.is_empty() || crate::naming::sanitize_slug(index_name) != *index_name {
            return Err(ConfigError::Validation(format!(
                "presentation.index_name '{index_name}' must be a plain slug (letters, digits, '-', '_')"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for grouping in &self.grouping {
            grouping.validate()?;
        }
        Ok(())
    }

    /// Extensions lowercased, without leading dots, empty entries dropped.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    pub fn image_base_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("base_url", &self.base_url)
    }

    pub fn manifest_base_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("manifest_url", &self.manifest_url)
    }
}

fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{key} '{value}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::Validation(format!(
            "{key} '{value}' must be an http(s) URL"
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::Validation(format!(
            "{key} '{value}' must not have a query or fragment"
        )));
    }
    Ok(url)
}

/// How CSV metadata is keyed and emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Column identifying the image a row belongs to.
    pub key_column: String,
    /// Emit label/value pairs whose value is empty. When false they are omitted.
    pub include_empty: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            key_column: "filename".to_string(),
            include_empty: true,
        }
    }
}

/// Format of the painting body requested from the image server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFormat {
    Jpg,
    Png,
    /// Same format as the source file, when the image server can deliver it.
    Source,
}

/// Shape of the emitted IIIF documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresentationConfig {
    /// Language tag used for every label, summary and metadata value.
    pub language: String,
    pub delivery_format: DeliveryFormat,
    /// IIIF Image API compliance level advertised for the image service.
    pub image_profile: String,
    /// Longest edge of manifest thumbnails in pixels; 0 disables them.
    pub thumbnail_size: u32,
    /// File stem of the top-level collection.
    pub index_name: String,
    /// Label of the top-level collection.
    pub index_label: String,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            delivery_format: DeliveryFormat::Jpg,
            image_profile: "level2".to_string(),
            thumbnail_size: 200,
            index_name: "index".to_string(),
            index_label: "All images".to_string(),
        }
    }
}

/// Optional "sample" collection of the first N manifests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    pub size: usize,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel identification workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// How manifests are grouped into collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Grouping {
    /// One group per distinct value of a metadata column.
    Column { column: String },
    /// One group per file-stem prefix, up to the first `separator`.
    Prefix { separator: String },
    /// One group per subdirectory of the images directory.
    Directory,
    /// One group per listed column, holding images whose value equals `value`.
    Flags {
        columns: Vec<String>,
        #[serde(default = "default_flag_value")]
        value: String,
    },
}

fn default_flag_value() -> String {
    "1".to_string()
}

impl Grouping {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(format!("grouping {self}: {msg}")));
        match self {
            Grouping::Column { column } if column.trim().is_empty() => {
                invalid("column must not be empty")
            }
            Grouping::Prefix { separator } if separator.is_empty() => {
                invalid("separator must not be empty")
            }
            Grouping::Flags { columns, .. } if columns.is_empty() => {
                invalid("columns must not be empty")
            }
            Grouping::Flags { columns, .. } if columns.iter().any(|c| c.trim().is_empty()) => {
                invalid("column names must not be empty")
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grouping::Column { column } => write!(f, "column:{column}"),
            Grouping::Prefix { separator } => write!(f, "prefix:{separator}"),
            Grouping::Directory => write!(f, "directory"),
            Grouping::Flags { columns, .. } => write!(f, "flags:{}", columns.join(",")),
        }
    }
}

/// Parse the `--group-by` syntax: `column:<c>`, `prefix:<sep>`, `directory`,
/// `flags:<c1>,<c2>,...`.
impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        match (kind, arg) {
            ("column", Some(column)) if !column.is_empty() => Ok(Grouping::Column {
                column: column.to_string(),
            }),
            ("prefix", Some(separator)) if !separator.is_empty() => Ok(Grouping::Prefix {
                separator: separator.to_string(),
            }),
            ("directory", None) => Ok(Grouping::Directory),
            ("flags", Some(columns)) if !columns.is_empty() => Ok(Grouping::Flags {
                columns: columns.split(',').map(|c| c.trim().to_string()).collect(),
                value: default_flag_value(),
            }),
            _ => Err(format!(
                "invalid grouping '{s}': expected column:<name>, prefix:<separator>, directory or flags:<col1,col2,...>"
            )),
        }
    }
}

/// Values resolved from command-line flags and environment variables.
///
/// `None` fields are left out of the overlay and do not override anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<Vec<Grouping>>,
}

impl Overrides {
    pub fn to_toml(&self) -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(self)
            .map_err(|e| ConfigError::Validation(format!("cannot apply overrides: {e}")))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GeneratorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (arrays included) replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config<I>(base: toml::Value, overlays: I) -> Result<GeneratorConfig, ConfigError>
where
    I: IntoIterator<Item = toml::Value>,
{
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the full layered configuration.
///
/// An explicit `config_path` must exist; without one, [`CONFIG_FILENAME`] in
/// the working directory is used if present.
pub fn load_config(
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<GeneratorConfig, ConfigError> {
    let file = match config_path {
        Some(path) => Some(
            load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?,
        ),
        None => load_raw_config(Path::new(CONFIG_FILENAME))?,
    };
    let layers = file.into_iter().chain(std::iter::once(overrides.to_toml()?));
    resolve_config(stock_defaults_value(), layers)
}

/// Returns a fully-commented stock `iiif-gen.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# iiif-gen configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Precedence, lowest first:
#   stock defaults -> this file -> environment variables -> command-line flags
#
# Unknown keys will cause an error.

# Directory scanned for images (env IMAGES_DIR, --images-dir).
images_dir = "data/images"

# Directory the JSON documents are written to (env OUTPUT_DIR, --output-dir).
output_dir = "out/collections"

# Base URL of the IIIF image server (env IIIF_BASE_URL, --base-url).
# Image services are referenced as {base_url}/iiif/3/{filename}.
base_url = "http://localhost:8182"

# URL under which output_dir is published by the static file server
# (env MANIFEST_BASE_URL, --manifest-url). Manifests get {manifest_url}/{slug}.json.
manifest_url = "http://localhost:8080/collections"

# Optional CSV with per-image metadata (env METADATA_FILE, --metadata-file).
# metadata_file = "data/metadata.csv"

# Accepted image extensions, case-insensitive.
extensions = ["jpg", "jpeg", "png", "tif", "tiff"]

# Descend into subdirectories of images_dir (--recursive).
recursive = false

# ---------------------------------------------------------------------------
# CSV metadata
# ---------------------------------------------------------------------------
[metadata]
# Column naming the image a row belongs to. Matched against the file name,
# then against the file name without extension.
key_column = "filename"

# Emit label/value pairs whose value is empty, so every manifest carries
# the same labels. Set to false to omit them.
include_empty = true

# ---------------------------------------------------------------------------
# IIIF documents
# ---------------------------------------------------------------------------
[presentation]
# Language tag for labels, summaries and metadata values.
language = "en"

# Format requested from the image server for the painting body:
# "jpg", "png", or "source" (same as the file, when the server supports it).
delivery_format = "jpg"

# IIIF Image API compliance level of the image server.
image_profile = "level2"

# Longest edge of manifest thumbnails in pixels. 0 disables thumbnails.
thumbnail_size = 200

# Top-level collection: written to {output_dir}/{index_name}.json.
index_name = "index"
index_label = "All images"

# ---------------------------------------------------------------------------
# Sample collection (sample.json) of the first N manifests (--sample-size)
# ---------------------------------------------------------------------------
[sample]
# 0 disables the sample collection.
size = 0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel identification workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Groupings (--group-by). Each produces one collection per group.
# ---------------------------------------------------------------------------
# By the value of a metadata column:
# [[grouping]]
# by = "column"
# column = "set"
#
# By file name prefix, up to the first separator:
# [[grouping]]
# by = "prefix"
# separator = "_"
#
# By subdirectory (with recursive = true):
# [[grouping]]
# by = "directory"
#
# By one-hot flag columns; an image can land in several groups:
# [[grouping]]
# by = "flags"
# columns = ["11F(MARY)", "11H(JEROME)"]
# value = "1"
"##
}

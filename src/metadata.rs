//! Per-image metadata loaded from a CSV file.
//!
//! The CSV is optional. When present, one column identifies the image (the
//! *key column*, `filename` by default) and every other column becomes a
//! label/value pair on that image's manifest, in header order:
//!
//! ```text
//! filename,set,category          a.jpg manifest metadata:
//! a.jpg,train,portrait     →       set: train
//! b.png,test,                      category: portrait
//! ```
//!
//! ## Matching rows to images
//!
//! A row matches an image when its key equals the image's file name, or,
//! failing that, the image's file stem. The stem fallback covers datasets
//! whose CSV lists item ids without extensions (`ICCD_001` for
//! `ICCD_001.jpg`).
//!
//! ## Tolerated irregularities
//!
//! - rows whose key matches no image are ignored (see [`MetadataTable::unmatched`])
//! - rows with an empty key are dropped at load time
//! - duplicate keys keep the first row and log a warning
//! - images without a row simply carry no metadata
//!
//! The only hard failures are an unreadable/malformed file and a missing key
//! column.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("cannot read metadata file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed metadata file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("metadata file {path} has no '{column}' column (found: {found})")]
    MissingKeyColumn {
        path: PathBuf,
        column: String,
        found: String,
    },
}

/// One label/value pair, in CSV header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub label: String,
    pub value: String,
}

/// A CSV row keyed by its key column; the key itself is not a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    pub fields: Vec<MetadataField>,
}

impl MetadataRow {
    /// Value of a column, if the row has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == column)
            .map(|f| f.value.as_str())
    }
}

/// All rows of a metadata CSV, keyed by the key column.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    /// Non-key columns in header order.
    pub columns: Vec<String>,
    rows: IndexMap<String, MetadataRow>,
}

impl MetadataTable {
    /// Load a CSV file, keying rows by `key_column`.
    pub fn load(path: &Path, key_column: &str) -> Result<Self, MetadataError> {
        let file = std::fs::File::open(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, key_column).map_err(|e| e.at(path))
    }

    /// Parse CSV content from any reader. Errors carry an empty path until
    /// [`MetadataTable::load`] attaches the real one.
    pub fn from_reader<R: std::io::Read>(reader: R, key_column: &str) -> Result<Self, MetadataError> {
        let csv_err = |source| MetadataError::Csv {
            path: PathBuf::new(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let key_index = headers
            .iter()
            .position(|h| h == key_column)
            .ok_or_else(|| MetadataError::MissingKeyColumn {
                path: PathBuf::new(),
                column: key_column.to_string(),
                found: headers.join(", "),
            })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_index)
            .map(|(_, h)| h.clone())
            .collect();

        let mut rows: IndexMap<String, MetadataRow> = IndexMap::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            let key = record.get(key_index).unwrap_or_default().to_string();
            if key.is_empty() {
                log::debug!("metadata row {} has an empty '{}', ignored", line + 2, key_column);
                continue;
            }
            if rows.contains_key(&key) {
                log::warn!("duplicate metadata row for '{}' (line {}), keeping the first", key, line + 2);
                continue;
            }
            let fields = headers
                .iter()
                .zip(record.iter())
                .enumerate()
                .filter(|(i, _)| *i != key_index)
                .map(|(_, (label, value))| MetadataField {
                    label: label.clone(),
                    value: value.to_string(),
                })
                .collect();
            rows.insert(key, MetadataRow { fields });
        }

        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row for an image: exact file name first, then stem.
    pub fn lookup(&self, filename: &str, stem: &str) -> Option<&MetadataRow> {
        self.rows.get(filename).or_else(|| self.rows.get(stem))
    }

    /// Keys of rows that match none of the given `(filename, stem)` pairs.
    pub fn unmatched<'a, I>(&self, images: I) -> Vec<&str>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut known: HashSet<&str> = HashSet::new();
        for (filename, stem) in images {
            known.insert(filename);
            known.insert(stem);
        }
        self.rows
            .keys()
            .filter(|k| !known.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl MetadataError {
    /// Attach the file path to an error produced by [`MetadataTable::from_reader`].
    fn at(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            MetadataError::Io { source, .. } => MetadataError::Io { path, source },
            MetadataError::Csv { source, .. } => MetadataError::Csv { path, source },
            MetadataError::MissingKeyColumn { column, found, .. } => {
                MetadataError::MissingKeyColumn { path, column, found }
            }
        }
    }
}

/// Fields of a row in the form emitted on a manifest.
///
/// Empty values are kept when `include_empty` is set and dropped otherwise.
pub fn manifest_fields(row: Option<&MetadataRow>, include_empty: bool) -> Vec<MetadataField> {
    row.map(|r| {
        r.fields
            .iter()
            .filter(|f| include_empty || !f.value.is_empty())
            .cloned()
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn table(csv: &str) -> MetadataTable {
        MetadataTable::from_reader(csv.as_bytes(), "filename").unwrap()
    }

    #[test]
    fn loads_rows_keyed_by_filename() {
        let t = table("filename,category\na.jpg,portrait\nb.png,landscape\n");
        assert_eq!(t.len(), 2);
        assert_eq!(t.columns, vec!["category"]);
        let row = t.lookup("a.jpg", "a").unwrap();
        assert_eq!(row.get("category"), Some("portrait"));
        assert_eq!(row.get("filename"), None);
    }

    #[test]
    fn fields_keep_header_order() {
        let t = table("zeta,filename,alpha\n1,a.jpg,2\n");
        let row = t.lookup("a.jpg", "a").unwrap();
        let labels: Vec<&str> = row.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["zeta", "alpha"]);
    }

    #[test]
    fn lookup_falls_back_to_stem() {
        let t = MetadataTable::from_reader("item,set\nICCD_001,train\n".as_bytes(), "item").unwrap();
        let row = t.lookup("ICCD_001.jpg", "ICCD_001").unwrap();
        assert_eq!(row.get("set"), Some("train"));
    }

    #[test]
    fn lookup_prefers_exact_filename() {
        let t = table("filename,v\na,stem\na.jpg,exact\n");
        assert_eq!(t.lookup("a.jpg", "a").unwrap().get("v"), Some("exact"));
    }

    #[test]
    fn missing_key_column_is_error() {
        let err = MetadataTable::from_reader("name,category\na.jpg,x\n".as_bytes(), "filename")
            .unwrap_err();
        match err {
            MetadataError::MissingKeyColumn { column, found, .. } => {
                assert_eq!(column, "filename");
                assert_eq!(found, "name, category");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_csv_error() {
        let err = MetadataTable::from_reader("filename,a\nx.jpg,1,2\n".as_bytes(), "filename")
            .unwrap_err();
        assert!(matches!(err, MetadataError::Csv { .. }));
    }

    #[test]
    fn duplicate_keys_keep_first_row() {
        let t = table("filename,v\na.jpg,first\na.jpg,second\n");
        assert_eq!(t.len(), 1);
        assert_eq!(t.lookup("a.jpg", "a").unwrap().get("v"), Some("first"));
    }

    #[test]
    fn empty_keys_are_dropped() {
        let t = table("filename,v\n,orphan\na.jpg,x\n");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn values_are_trimmed_and_bom_stripped() {
        let t = table("\u{feff}filename, v \n a.jpg , padded \n");
        assert_eq!(t.lookup("a.jpg", "a").unwrap().get("v"), Some("padded"));
    }

    #[test]
    fn unmatched_lists_rows_without_images() {
        let t = table("filename,v\na.jpg,1\nghost.jpg,2\nb,3\n");
        let unmatched = t.unmatched([("a.jpg", "a"), ("b.png", "b")]);
        assert_eq!(unmatched, vec!["ghost.jpg"]);
    }

    #[test]
    fn manifest_fields_drop_empty_values() {
        let t = table("filename,set,category\nb.png,test,\n");
        let row = t.lookup("b.png", "b");
        let fields = manifest_fields(row, false);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label, "set");
        assert_eq!(manifest_fields(row, true).len(), 2);
        assert!(manifest_fields(None, true).is_empty());
    }

    #[test]
    fn load_attaches_path_to_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("meta.csv");
        fs::write(&path, "name\nx\n").unwrap();

        let err = MetadataTable::load(&path, "filename").unwrap_err();
        assert!(err.to_string().contains("meta.csv"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = MetadataTable::load(Path::new("/nonexistent/meta.csv"), "filename").unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }
}

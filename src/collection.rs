//! Collection construction.
//!
//! Manifests are grouped into IIIF Collections by each configured
//! [`Grouping`]. Every distinct group value becomes one collection written to
//! `{group_slug}.json`:
//!
//! ```text
//! grouping column:set          filename,set        train.json  → a, c
//!                              a.jpg,train         test.json   → b
//!                              b.png,test
//!                              c.jpg,train
//!
//! grouping flags:MARY,JEROME   filename,MARY,JEROME
//!                              a.jpg,1,0           MARY.json   → a, c
//!                              b.png,0,0           JEROME.json → c
//!                              c.jpg,1,1
//! ```
//!
//! Groups appear in order of first appearance in scan order, except flag
//! groups, which follow the configured column order. Members keep scan order.
//! An image with no value for a grouping is left out of that grouping.
//!
//! The top-level index collection references every group collection. With no
//! groups it lists all manifests directly instead. The sample collection, when
//! configured, is referenced after either.
//!
//! Like [`crate::manifest`], this module is pure.

use crate::config::{GeneratorConfig, Grouping};
use crate::manifest::{ImageRecord, UrlScheme};
use crate::naming;
use crate::presentation::{Collection, Manifest, PRESENTATION_CONTEXT, Reference, language_map};
use indexmap::IndexMap;

/// Slug of the sample collection.
pub const SAMPLE_SLUG: &str = "sample";

/// One group of records produced by a grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// The group value: a column value, a prefix, a directory or a flag column.
    pub name: String,
    /// Indices into the record list, in scan order.
    pub members: Vec<usize>,
}

/// A collection together with the slug it is written under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCollection {
    pub slug: String,
    pub collection: Collection,
}

/// Every collection of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Collections {
    pub groups: Vec<NamedCollection>,
    pub sample: Option<NamedCollection>,
    pub index: NamedCollection,
}

impl Collections {
    /// All collections in write order: groups, sample, index.
    pub fn iter(&self) -> impl Iterator<Item = &NamedCollection> {
        self.groups
            .iter()
            .chain(self.sample.as_ref())
            .chain(std::iter::once(&self.index))
    }

    pub fn len(&self) -> usize {
        self.groups.len() + usize::from(self.sample.is_some()) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Split records into the groups of one grouping.
pub fn group_records(records: &[ImageRecord], grouping: &Grouping) -> Vec<Group> {
    match grouping {
        Grouping::Column { column } => group_by_key(records, |r| r.column(column)),
        Grouping::Prefix { separator } => group_by_key(records, |r| {
            r.file
                .stem
                .split_once(separator.as_str())
                .map(|(prefix, _)| prefix)
                .filter(|p| !p.is_empty())
        }),
        Grouping::Directory => group_by_key(records, |r| r.file.directory.as_deref()),
        Grouping::Flags { columns, value } => columns
            .iter()
            .map(|column| Group {
                name: column.clone(),
                members: records
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.column(column) == Some(value.as_str()))
                    .map(|(i, _)| i)
                    .collect(),
            })
            .filter(|group| {
                if group.members.is_empty() {
                    log::warn!("flag column '{}' has no images with value '{}', skipped", group.name, value);
                }
                !group.members.is_empty()
            })
            .collect(),
    }
}

fn group_by_key<'a, F>(records: &'a [ImageRecord], key: F) -> Vec<Group>
where
    F: Fn(&'a ImageRecord) -> Option<&'a str>,
{
    let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(k) = key(record) {
            groups.entry(k).or_default().push(i);
        }
    }
    groups
        .into_iter()
        .map(|(name, members)| Group {
            name: name.to_string(),
            members,
        })
        .collect()
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "image" } else { "images" }
}

fn collection(
    slug: &str,
    label: &str,
    summary: String,
    items: Vec<Reference>,
    urls: &UrlScheme,
    language: &str,
) -> NamedCollection {
    NamedCollection {
        slug: slug.to_string(),
        collection: Collection {
            context: PRESENTATION_CONTEXT.to_string(),
            id: urls.document(slug),
            kind: "Collection".to_string(),
            label: language_map(language, label),
            summary: Some(language_map(language, summary)),
            items,
        },
    }
}

fn describe(grouping: &Grouping, group: &str) -> String {
    match grouping {
        Grouping::Column { column } => format!("{column} = {group}"),
        Grouping::Prefix { separator } => format!("file name prefix {group}{separator}"),
        Grouping::Directory => format!("directory {group}/"),
        Grouping::Flags { value, .. } => format!("{group} = {value}"),
    }
}

/// Build the group, sample and index collections.
///
/// `manifests[i]` must be the manifest built from `records[i]`.
pub fn build_collections(
    records: &[ImageRecord],
    manifests: &[Manifest],
    config: &GeneratorConfig,
    urls: &UrlScheme,
) -> Collections {
    let lang = config.presentation.language.as_str();
    let refs = |members: &[usize]| -> Vec<Reference> {
        members
            .iter()
            .map(|&i| Reference::to_manifest(&manifests[i]))
            .collect()
    };

    let mut groups = Vec::new();
    for grouping in &config.grouping {
        let found = group_records(records, grouping);
        if found.is_empty() {
            log::warn!("grouping {grouping} produced no groups");
        }
        for group in found {
            let slug = naming::slug_or_hash(&group.name, &format!("{grouping}/{}", group.name));
            let n = group.members.len();
            let summary = format!("{n} {} with {}", plural(n), describe(grouping, &group.name));
            groups.push(collection(&slug, &group.name, summary, refs(&group.members), urls, lang));
        }
    }

    let sample = (config.sample.size > 0).then(|| {
        let n = config.sample.size.min(manifests.len());
        let members: Vec<usize> = (0..n).collect();
        collection(
            SAMPLE_SLUG,
            &format!("Sample Collection ({n} {})", plural(n)),
            format!("First {n} {} of the collection", plural(n)),
            refs(&members),
            urls,
            lang,
        )
    });

    // Every manifest stays reachable from the index.
    let total = manifests.len();
    let sample_ref = sample.as_ref().map(|named| Reference::to_collection(&named.collection));
    let (mut items, summary) = if groups.is_empty() {
        let all: Vec<usize> = (0..total).collect();
        (refs(&all), format!("{total} {}", plural(total)))
    } else {
        let summary = format!(
            "{total} {} in {} {}",
            plural(total),
            groups.len(),
            if groups.len() == 1 { "collection" } else { "collections" }
        );
        let nested = groups
            .iter()
            .map(|named| Reference::to_collection(&named.collection))
            .collect();
        (nested, summary)
    };
    items.extend(sample_ref);
    let index = collection(
        &config.presentation.index_name,
        &config.presentation.index_label,
        summary,
        items,
        urls,
        lang,
    );

    Collections {
        groups,
        sample,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SampleConfig;
    use crate::imaging::Dimensions;
    use crate::manifest::build_manifest;
    use crate::metadata::MetadataTable;
    use crate::test_helpers::image_file;

    /// Records for `files` with metadata from an inline CSV.
    fn records(files: &[&str], csv: &str) -> Vec<ImageRecord> {
        let urls = UrlScheme::from_config(&GeneratorConfig::default()).unwrap();
        let table = MetadataTable::from_reader(csv.as_bytes(), "filename").unwrap();
        files
            .iter()
            .map(|name| {
                let file = image_file(name);
                let row = table.lookup(&file.filename, &file.stem);
                ImageRecord::new(file, Dimensions { width: 10, height: 10 }, row, &urls, false)
            })
            .collect()
    }

    fn build(records: &[ImageRecord], config: &GeneratorConfig) -> Collections {
        let urls = UrlScheme::from_config(config).unwrap();
        let manifests: Vec<Manifest> = records
            .iter()
            .map(|r| build_manifest(r, &urls, &config.presentation))
            .collect();
        build_collections(records, &manifests, config, &urls)
    }

    fn names(groups: &[Group]) -> Vec<(&str, Vec<usize>)> {
        groups
            .iter()
            .map(|g| (g.name.as_str(), g.members.clone()))
            .collect()
    }

    fn item_ids(collection: &NamedCollection) -> Vec<&str> {
        collection
            .collection
            .items
            .iter()
            .map(|r| r.id.as_str())
            .collect()
    }

    const SETS: &str = "filename,set\na.jpg,train\nb.png,test\nc.jpg,train\n";

    // =========================================================================
    // Grouping
    // =========================================================================

    #[test]
    fn column_groups_in_first_appearance_order() {
        let recs = records(&["a.jpg", "b.png", "c.jpg"], SETS);
        let groups = group_records(&recs, &Grouping::Column { column: "set".into() });
        assert_eq!(names(&groups), vec![("train", vec![0, 2]), ("test", vec![1])]);
    }

    #[test]
    fn column_group_skips_missing_and_empty_values() {
        let recs = records(&["a.jpg", "b.png", "d.jpg"], "filename,set\na.jpg,train\nb.png,\n");
        let groups = group_records(&recs, &Grouping::Column { column: "set".into() });
        assert_eq!(names(&groups), vec![("train", vec![0])]);
    }

    #[test]
    fn prefix_groups_by_stem_before_separator() {
        let recs = records(&["ICCD_1.jpg", "ICCD_2.jpg", "wga_1.jpg", "loose.jpg"], "filename\n");
        let groups = group_records(&recs, &Grouping::Prefix { separator: "_".into() });
        assert_eq!(names(&groups), vec![("ICCD", vec![0, 1]), ("wga", vec![2])]);
    }

    #[test]
    fn directory_groups_leave_top_level_out() {
        let mut recs = records(&["a.jpg", "b.jpg", "c.jpg"], "filename\n");
        recs[0].file.directory = Some("saints".into());
        recs[2].file.directory = Some("saints".into());
        let groups = group_records(&recs, &Grouping::Directory);
        assert_eq!(names(&groups), vec![("saints", vec![0, 2])]);
    }

    #[test]
    fn flags_allow_multiple_membership_and_follow_column_order() {
        let csv = "filename,MARY,JEROME,PETER\na.jpg,1,0,0\nb.png,0,0,0\nc.jpg,1,1,0\n";
        let recs = records(&["a.jpg", "b.png", "c.jpg"], csv);
        let grouping = Grouping::Flags {
            columns: vec!["JEROME".into(), "MARY".into(), "PETER".into()],
            value: "1".into(),
        };
        let groups = group_records(&recs, &grouping);
        assert_eq!(names(&groups), vec![("JEROME", vec![2]), ("MARY", vec![0, 2])]);
    }

    // =========================================================================
    // Collections
    // =========================================================================

    #[test]
    fn no_grouping_index_lists_all_manifests() {
        let recs = records(&["a.jpg", "b.png"], "filename\n");
        let collections = build(&recs, &GeneratorConfig::default());

        assert!(collections.groups.is_empty());
        assert!(collections.sample.is_none());
        assert_eq!(collections.len(), 1);
        assert_eq!(collections.index.slug, "index");
        assert_eq!(
            item_ids(&collections.index),
            vec![
                "http://localhost:8080/collections/a.jpg.json",
                "http://localhost:8080/collections/b.png.json"
            ]
        );
        assert!(collections.index.collection.items.iter().all(|r| r.kind == "Manifest"));
    }

    #[test]
    fn grouped_index_references_group_collections() {
        let recs = records(&["a.jpg", "b.png", "c.jpg"], SETS);
        let config = GeneratorConfig {
            grouping: vec![Grouping::Column { column: "set".into() }],
            ..Default::default()
        };
        let collections = build(&recs, &config);

        let slugs: Vec<&str> = collections.groups.iter().map(|g| g.slug.as_str()).collect();
        assert_eq!(slugs, vec!["train", "test"]);
        assert_eq!(
            item_ids(&collections.groups[0]),
            vec![
                "http://localhost:8080/collections/a.jpg.json",
                "http://localhost:8080/collections/c.jpg.json"
            ]
        );
        assert_eq!(
            collections.groups[0].collection.summary.as_ref().unwrap()["en"],
            vec!["2 images with set = train"]
        );

        assert_eq!(
            item_ids(&collections.index),
            vec![
                "http://localhost:8080/collections/train.json",
                "http://localhost:8080/collections/test.json"
            ]
        );
        assert!(collections.index.collection.items.iter().all(|r| r.kind == "Collection"));
    }

    #[test]
    fn sample_takes_first_manifests_and_is_capped() {
        let recs = records(&["a.jpg", "b.png", "c.jpg"], "filename\n");
        let config = GeneratorConfig {
            sample: SampleConfig { size: 2 },
            ..Default::default()
        };
        let collections = build(&recs, &config);
        let sample = collections.sample.as_ref().unwrap();
        assert_eq!(sample.slug, "sample");
        assert_eq!(sample.collection.items.len(), 2);

        let config = GeneratorConfig {
            sample: SampleConfig { size: 50 },
            ..Default::default()
        };
        let collections = build(&recs, &config);
        assert_eq!(collections.sample.unwrap().collection.items.len(), 3);
    }

    #[test]
    fn sample_without_groups_keeps_every_manifest_in_index() {
        let recs = records(&["a.jpg", "b.png", "c.jpg"], "filename\n");
        let config = GeneratorConfig {
            sample: SampleConfig { size: 1 },
            ..Default::default()
        };
        let collections = build(&recs, &config);
        assert_eq!(
            item_ids(&collections.index),
            vec![
                "http://localhost:8080/collections/a.jpg.json",
                "http://localhost:8080/collections/b.png.json",
                "http://localhost:8080/collections/c.jpg.json",
                "http://localhost:8080/collections/sample.json"
            ]
        );
        assert_eq!(
            collections.index.collection.summary.as_ref().unwrap()["en"],
            vec!["3 images"]
        );
    }

    #[test]
    fn sample_with_groups_follows_group_references() {
        let recs = records(&["a.jpg", "b.png", "c.jpg"], SETS);
        let config = GeneratorConfig {
            grouping: vec![Grouping::Column { column: "set".into() }],
            sample: SampleConfig { size: 2 },
            ..Default::default()
        };
        let collections = build(&recs, &config);
        assert_eq!(
            item_ids(&collections.index),
            vec![
                "http://localhost:8080/collections/train.json",
                "http://localhost:8080/collections/test.json",
                "http://localhost:8080/collections/sample.json"
            ]
        );
    }

    #[test]
    fn group_slugs_are_sanitized() {
        let recs = records(&["a.jpg"], "filename,cat\na.jpg,11H(JEROME)\n");
        let config = GeneratorConfig {
            grouping: vec![Grouping::Column { column: "cat".into() }],
            ..Default::default()
        };
        let collections = build(&recs, &config);
        assert_eq!(collections.groups[0].slug, "11H-JEROME");
        assert_eq!(collections.groups[0].collection.label["en"], vec!["11H(JEROME)"]);
    }

    #[test]
    fn iter_yields_groups_then_sample_then_index() {
        let recs = records(&["a.jpg", "b.png", "c.jpg"], SETS);
        let config = GeneratorConfig {
            grouping: vec![Grouping::Column { column: "set".into() }],
            sample: SampleConfig { size: 1 },
            ..Default::default()
        };
        let collections = build(&recs, &config);
        let slugs: Vec<&str> = collections.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["train", "test", "sample", "index"]);
        assert_eq!(collections.len(), 4);
    }

    #[test]
    fn unknown_grouping_column_yields_no_groups() {
        let recs = records(&["a.jpg"], SETS);
        let config = GeneratorConfig {
            grouping: vec![Grouping::Column { column: "nope".into() }],
            ..Default::default()
        };
        let collections = build(&recs, &config);
        assert!(collections.groups.is_empty());
        assert_eq!(collections.index.collection.items.len(), 1);
    }
}

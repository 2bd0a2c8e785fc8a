//! Builds the generated index file for one directory.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ResolvedIndexConfig;
use crate::enumerator::Child;
use crate::error::{IndexError, Result};
use crate::file_map::{FileEntry, FileMap, FileStat, IndexEntry, join_key};

/// Turns an enumerated child list into an index file.
pub struct IndexBuilder<'a> {
    config: &'a ResolvedIndexConfig,
}

impl<'a> IndexBuilder<'a> {
    /// Create a builder for a resolved directory configuration.
    pub fn new(config: &'a ResolvedIndexConfig) -> Self {
        Self { config }
    }

    /// Build the index file without touching the file map.
    ///
    /// Children are ordered with the configured comparator, then filtered and
    /// rendered in that order. Fails with [`IndexError::StaleEntryReference`]
    /// if a file child has no entry in `files`.
    pub fn build(&self, files: &FileMap, children: &[Child]) -> Result<FileEntry> {
        let config = self.config;

        let mut ordered: Vec<&Child> = children.iter().collect();
        ordered.sort_by(|a, b| (config.compare)(a.name.as_str(), b.name.as_str()));

        let mut listing = Vec::new();
        let mut contents = String::new();

        for child in ordered {
            let path = join_key(&config.dir, &child.name);
            let synthesized;
            let entry: &FileEntry = if child.is_dir() {
                synthesized = FileEntry::directory(child.mtime);
                &synthesized
            } else {
                match files.get(&path) {
                    Some(entry) => entry,
                    None => {
                        return Err(IndexError::StaleEntryReference {
                            dir: config.dir.clone(),
                            path,
                        });
                    }
                }
            };

            if !(config.filter)(child.name.as_str(), entry) {
                continue;
            }

            contents.push_str(&(config.format)(child.name.as_str(), entry));
            listing.push(IndexEntry {
                name: child.name.clone(),
                path,
                date: entry.stats.mtime,
            });
        }

        let mtime = listing
            .iter()
            .map(|e| e.date)
            .max()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let contents = contents.into_bytes();

        Ok(FileEntry {
            stats: FileStat::file(mtime, contents.len() as u64),
            contents,
            metadata: config.metadata.clone(),
            files: Some(listing),
        })
    }

    /// Build the index file and insert it into `files`.
    ///
    /// Nothing is inserted when building fails. Returns the key of the new
    /// entry.
    pub fn build_into(&self, files: &mut FileMap, children: &[Child]) -> Result<String> {
        let index = self.build(files, children)?;
        let destination = self.config.destination();

        debug!(
            "Built {} with {} entries",
            destination,
            index.files.as_ref().map_or(0, Vec::len)
        );

        files.insert(&destination, index);
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::CallbackRegistry;
    use crate::config::IndexOptions;
    use crate::enumerator::ChildKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn file(name: &str) -> Child {
        Child {
            name: name.to_string(),
            kind: ChildKind::File,
            mtime: at(0),
        }
    }

    fn row(name: &str, date: DateTime<Utc>) -> IndexEntry {
        IndexEntry {
            name: name.to_string(),
            path: format!("pub/{name}"),
            date,
        }
    }

    fn sample_files() -> FileMap {
        let mut files = FileMap::new();
        files.insert("pub/a.md", FileEntry::new("a", at(10)));
        files.insert("pub/bb.md", FileEntry::new("bb", at(20)));
        files.insert("pub/ccc.md", FileEntry::new("ccc", at(30)));
        files
    }

    fn resolve(options: IndexOptions) -> ResolvedIndexConfig {
        options.resolve("pub", &CallbackRegistry::new()).unwrap()
    }

    #[test]
    fn test_default_build() {
        let files = sample_files();
        let config = resolve(IndexOptions::new());
        let children = vec![file("a.md"), file("bb.md"), file("ccc.md")];

        let index = IndexBuilder::new(&config).build(&files, &children).unwrap();

        assert_eq!(index.contents_lossy(), "ccc.md\nbb.md\na.md\n");
        let listing = index.files.unwrap();
        assert_eq!(
            listing,
            vec![row("ccc.md", at(30)), row("bb.md", at(20)), row("a.md", at(10))]
        );
        assert_eq!(index.stats.mtime, at(30));
        assert_eq!(index.stats.size, index.contents.len() as u64);
    }

    #[test]
    fn test_filter_skips_listing_and_contents() {
        let files = sample_files();
        let config = resolve(IndexOptions::new().with_filter(|name, _| name != "bb.md"));
        let children = vec![file("a.md"), file("bb.md"), file("ccc.md")];

        let index = IndexBuilder::new(&config).build(&files, &children).unwrap();

        assert_eq!(index.contents_lossy(), "ccc.md\na.md\n");
        assert_eq!(index.files.unwrap().len(), 2);
    }

    #[test]
    fn test_format_sees_entry() {
        let files = sample_files();
        let config = resolve(
            IndexOptions::new()
                .with_compare(|a, b| a.cmp(b))
                .with_format(|name, entry| format!("{name}:{}|", entry.contents_lossy())),
        );
        let children = vec![file("ccc.md"), file("a.md")];

        let index = IndexBuilder::new(&config).build(&files, &children).unwrap();
        assert_eq!(index.contents_lossy(), "a.md:a|ccc.md:ccc|");
    }

    #[test]
    fn test_directory_child_is_synthesized() {
        let files = sample_files();
        let config = resolve(IndexOptions::new());
        let children = vec![
            file("a.md"),
            Child {
                name: "sub".into(),
                kind: ChildKind::Directory,
                mtime: at(99),
            },
        ];

        let index = IndexBuilder::new(&config).build(&files, &children).unwrap();
        let listing = index.files.unwrap();

        assert_eq!(listing[0].name, "a.md");
        assert_eq!(listing[1].name, "sub");
        assert_eq!(listing[1].path, "pub/sub");
        assert_eq!(listing[1].date, at(99));
    }

    #[test]
    fn test_missing_child_fails_without_insert() {
        let mut files = sample_files();
        let config = resolve(IndexOptions::new());
        let children = vec![file("a.md"), file("gone.md")];

        let err = IndexBuilder::new(&config)
            .build_into(&mut files, &children)
            .unwrap_err();

        assert!(
            matches!(err, IndexError::StaleEntryReference { ref path, .. } if path == "pub/gone.md")
        );
        assert!(!files.contains("pub/index.list"));
    }

    #[test]
    fn test_build_into_inserts_with_metadata() {
        let mut files = sample_files();
        let config = resolve(IndexOptions::new().with_filename("ZZZ").with_metadata("title", "T"));

        let destination = IndexBuilder::new(&config)
            .build_into(&mut files, &[file("a.md")])
            .unwrap();

        assert_eq!(destination, "pub/ZZZ");
        let index = files.get("pub/ZZZ").unwrap();
        assert_eq!(index.meta("title"), Some(&serde_json::json!("T")));
        assert_eq!(files.len(), 4);
    }

    #[test]
    fn test_empty_listing() {
        let files = FileMap::new();
        let config = resolve(IndexOptions::new());

        let index = IndexBuilder::new(&config).build(&files, &[]).unwrap();

        assert!(index.contents.is_empty());
        assert_eq!(index.files, Some(Vec::new()));
        assert_eq!(index.stats.mtime, DateTime::<Utc>::UNIX_EPOCH);
    }
}

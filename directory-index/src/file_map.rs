//! The in-memory file set shared by every step of a build.

use std::collections::BTreeMap;
use std::collections::btree_map;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arbitrary metadata attached to a file (front matter, plugin output, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Stat-like information about a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Last modification time.
    pub mtime: DateTime<Utc>,

    /// Size in bytes.
    pub size: u64,

    /// Whether the entry stands for a directory.
    pub is_dir: bool,
}

impl FileStat {
    /// Stat for a regular file.
    pub fn file(mtime: DateTime<Utc>, size: u64) -> Self {
        Self {
            mtime,
            size,
            is_dir: false,
        }
    }

    /// Stat for a directory.
    pub fn directory(mtime: DateTime<Utc>) -> Self {
        Self {
            mtime,
            size: 0,
            is_dir: true,
        }
    }

    /// Stat from filesystem metadata. A missing mtime falls back to the Unix epoch.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let mtime = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            mtime,
            size: metadata.len(),
            is_dir: metadata.is_dir(),
        }
    }
}

/// One row of a generated directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path of the child relative to the indexed directory.
    pub name: String,

    /// Path of the child relative to the root of the file map.
    pub path: String,

    /// Modification time of the child.
    pub date: DateTime<Utc>,
}

/// A file in the build: contents, stat and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Raw file contents.
    pub contents: Vec<u8>,

    /// Stat information.
    pub stats: FileStat,

    /// Metadata attached by earlier steps.
    #[serde(default)]
    pub metadata: Metadata,

    /// Listing rows, present on generated index files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<IndexEntry>>,
}

impl FileEntry {
    /// Create a file entry with the given contents and modification time.
    pub fn new(contents: impl Into<Vec<u8>>, mtime: DateTime<Utc>) -> Self {
        let contents = contents.into();
        let size = contents.len() as u64;
        Self {
            contents,
            stats: FileStat::file(mtime, size),
            metadata: Metadata::new(),
            files: None,
        }
    }

    /// Stand-in entry for a subdirectory listed by a shallow index.
    pub fn directory(mtime: DateTime<Utc>) -> Self {
        Self {
            contents: Vec::new(),
            stats: FileStat::directory(mtime),
            metadata: Metadata::new(),
            files: None,
        }
    }

    /// Attach a metadata field.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Look up a metadata field.
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Contents as UTF-8, replacing invalid sequences.
    pub fn contents_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }
}

/// Mapping from normalized relative path to file entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMap {
    entries: BTreeMap<String, FileEntry>,
}

impl FileMap {
    /// Create an empty file map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, normalizing the key. Returns the previous entry, if any.
    pub fn insert(&mut self, path: impl AsRef<str>, entry: FileEntry) -> Option<FileEntry> {
        self.entries.insert(normalize_key(path.as_ref()), entry)
    }

    /// Get an entry by path.
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(normalize_key(path).as_str())
    }

    /// Remove an entry by path.
    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        self.entries.remove(normalize_key(path).as_str())
    }

    /// Check whether a path is present.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(normalize_key(path).as_str())
    }

    /// All paths, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries, sorted by path.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FileEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FileEntry)> for FileMap {
    fn from_iter<I: IntoIterator<Item = (String, FileEntry)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (path, entry) in iter {
            map.insert(path, entry);
        }
        map
    }
}

impl<'a> IntoIterator for &'a FileMap {
    type Item = (&'a String, &'a FileEntry);
    type IntoIter = btree_map::Iter<'a, String, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Normalize a relative path into file map key form.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and `..`
/// pops the previous segment. The root itself normalizes to `""`.
pub fn normalize_key(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Join a directory key and a relative name into a normalized key.
pub fn join_key(dir: &str, name: &str) -> String {
    normalize_key(&format!("{dir}/{name}"))
}

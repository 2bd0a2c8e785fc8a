//! The build host: where sources live and how they become a [`FileMap`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IndexError, Result};
use crate::file_map::{FileEntry, FileMap, FileStat, Metadata, normalize_key};

/// What the indexer needs from the build pipeline it runs in.
pub trait BuildHost: Send + Sync {
    /// Absolute path of the project's source directory.
    fn source_dir(&self) -> &Path;

    /// Absolute path of a directory key under the source directory.
    fn source_path(&self, key: &str) -> PathBuf {
        let key = normalize_key(key);
        if key.is_empty() {
            self.source_dir().to_path_buf()
        } else {
            self.source_dir().join(key)
        }
    }
}

/// A project source directory read from disk.
#[derive(Debug, Clone)]
pub struct SourceTree {
    /// Root of the source files.
    source_dir: PathBuf,

    /// Whether to split YAML front matter into metadata.
    front_matter: bool,
}

impl SourceTree {
    /// Create a source tree rooted at `source_dir`.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            front_matter: true,
        }
    }

    /// Enable or disable front matter parsing.
    pub fn with_front_matter(mut self, enabled: bool) -> Self {
        self.front_matter = enabled;
        self
    }

    /// Read every file below the source directory into a file map.
    pub fn read(&self) -> Result<FileMap> {
        let mut files = FileMap::new();

        for entry in WalkDir::new(&self.source_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();

            // Linked directories are listed but never descended into.
            if path.is_dir() {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.source_dir) else {
                continue;
            };
            let key = normalize_key(&relative.to_string_lossy());

            let target = match std::fs::metadata(path) {
                Ok(target) => target,
                Err(source) if entry.path_is_symlink() => {
                    warn!("Skipping dangling link {key}: {source}");
                    continue;
                }
                Err(source) => return Err(IndexError::Read { path: key, source }),
            };
            let bytes = std::fs::read(path).map_err(|source| IndexError::Read {
                path: key.clone(),
                source,
            })?;
            let stats = FileStat::from_metadata(&target);

            let (metadata, contents) = if self.front_matter {
                parse_front_matter(&key, bytes)?
            } else {
                (Metadata::new(), bytes)
            };

            debug!("Read {key} ({} bytes)", contents.len());
            files.insert(
                key,
                FileEntry {
                    contents,
                    stats,
                    metadata,
                    files: None,
                },
            );
        }

        info!(
            "Read {} files from {}",
            files.len(),
            self.source_dir.display()
        );
        Ok(files)
    }
}

impl BuildHost for SourceTree {
    fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

/// Split a leading `---` delimited YAML block off the file contents.
///
/// Files without a front matter block, or whose contents are not UTF-8, are
/// returned unchanged with empty metadata.
pub fn parse_front_matter(path: &str, bytes: Vec<u8>) -> Result<(Metadata, Vec<u8>)> {
    let Ok(text) = std::str::from_utf8(&bytes) else {
        return Ok((Metadata::new(), bytes));
    };

    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((Metadata::new(), bytes));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];

            let value: serde_yaml::Value =
                serde_yaml::from_str(yaml).map_err(|source| IndexError::FrontMatter {
                    path: path.to_string(),
                    source,
                })?;
            let metadata = match serde_json::to_value(value)? {
                serde_json::Value::Object(map) => map,
                serde_json::Value::Null => Metadata::new(),
                other => {
                    return Err(IndexError::Config(format!(
                        "front matter in {path} must be a mapping, got {other}"
                    )));
                }
            };

            return Ok((metadata, body.as_bytes().to_vec()));
        }
        offset += line.len();
    }

    // No closing delimiter: not front matter.
    Ok((Metadata::new(), bytes))
}

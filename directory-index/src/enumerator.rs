//! Directory enumeration for index building.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{IndexError, Result};

/// What kind of filesystem entry a child is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// A file, or anything else that is not a directory.
    File,

    /// A subdirectory listed by a shallow enumeration.
    Directory,
}

/// A child found under an indexed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Path relative to the enumerated root, `/` separated.
    pub name: String,

    /// Kind of entry.
    pub kind: ChildKind,

    /// Modification time reported by the filesystem.
    pub mtime: DateTime<Utc>,
}

impl Child {
    /// Check if this child is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == ChildKind::Directory
    }
}

/// Lists the children of one directory.
#[derive(Debug, Clone)]
pub struct TreeEnumerator {
    /// Absolute path of the directory.
    root: PathBuf,

    /// Whether to descend into subdirectories.
    recursive: bool,
}

impl TreeEnumerator {
    /// Create an enumerator for the given root.
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            recursive,
        }
    }

    /// The directory being enumerated.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List children, sorted by relative path.
    ///
    /// Shallow mode returns the direct entries of the root, subdirectories
    /// included. Recursive mode returns every file below the root and no
    /// directories. `dir` is the configured key, used for error reporting.
    pub fn enumerate(&self, dir: &str) -> Result<Vec<Child>> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| unavailable(dir, e))?;
        if !metadata.is_dir() {
            return Err(unavailable(
                dir,
                io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", self.root.display()),
                ),
            ));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name();

        let mut children = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| unavailable(dir, io::Error::from(e)))?;

            // Classify by what a link points at; links are never descended into.
            let target = match std::fs::metadata(entry.path()) {
                Ok(target) => target,
                Err(e) if entry.path_is_symlink() => {
                    debug!("Skipping dangling link {}: {e}", entry.path().display());
                    continue;
                }
                Err(e) => return Err(unavailable(dir, e)),
            };

            let kind = if target.is_dir() {
                if self.recursive {
                    continue;
                }
                ChildKind::Directory
            } else {
                ChildKind::File
            };

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };

            let mtime = target
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            children.push(Child {
                name: relative_name(relative),
                kind,
                mtime,
            });
        }

        children.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(
            "Enumerated {} children of {} (recursive: {})",
            children.len(),
            self.root.display(),
            self.recursive
        );

        Ok(children)
    }
}

/// Join path components with `/` regardless of platform.
fn relative_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn unavailable(dir: &str, source: io::Error) -> IndexError {
    IndexError::DirectoryUnavailable {
        dir: dir.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn names(children: &[Child]) -> Vec<&str> {
        children.iter().map(|c| c.name.as_str()).collect()
    }

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("top.md"), "top").unwrap();
        fs::create_dir_all(temp_dir.path().join("sub/deeper")).unwrap();
        fs::write(temp_dir.path().join("sub/nested.md"), "nested").unwrap();
        fs::write(temp_dir.path().join("sub/deeper/leaf.md"), "leaf").unwrap();
        temp_dir
    }

    #[test]
    fn test_shallow_lists_files_and_directories() {
        let temp_dir = fixture();
        let children = TreeEnumerator::new(temp_dir.path(), false)
            .enumerate("fixture")
            .unwrap();

        assert_eq!(names(&children), vec!["sub", "top.md"]);
        assert!(children[0].is_dir());
        assert_eq!(children[1].kind, ChildKind::File);
    }

    #[test]
    fn test_recursive_lists_only_files() {
        let temp_dir = fixture();
        let children = TreeEnumerator::new(temp_dir.path(), true)
            .enumerate("fixture")
            .unwrap();

        assert_eq!(
            names(&children),
            vec!["sub/deeper/leaf.md", "sub/nested.md", "top.md"]
        );
        assert!(children.iter().all(|c| !c.is_dir()));
    }

    #[cfg(unix)]
    #[test]
    fn test_links_are_classified_by_target() {
        use std::os::unix::fs::symlink;

        let temp_dir = fixture();
        let root = temp_dir.path();
        symlink(root.join("sub"), root.join("link")).unwrap();
        symlink(root.join("top.md"), root.join("alias.md")).unwrap();
        symlink(root.join("nowhere"), root.join("dangling")).unwrap();

        let shallow = TreeEnumerator::new(root, false)
            .enumerate("fixture")
            .unwrap();
        assert_eq!(names(&shallow), vec!["alias.md", "link", "sub", "top.md"]);
        assert!(shallow[1].is_dir());
        assert_eq!(shallow[0].kind, ChildKind::File);

        let recursive = TreeEnumerator::new(root, true)
            .enumerate("fixture")
            .unwrap();
        assert_eq!(
            names(&recursive),
            vec!["alias.md", "sub/deeper/leaf.md", "sub/nested.md", "top.md"]
        );
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let children = TreeEnumerator::new(temp_dir.path(), true)
            .enumerate("empty")
            .unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn test_missing_root_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let err = TreeEnumerator::new(temp_dir.path().join("nope"), false)
            .enumerate("nope")
            .unwrap_err();

        assert!(matches!(err, IndexError::DirectoryUnavailable { ref dir, .. } if dir == "nope"));
    }

    #[test]
    fn test_file_root_is_unavailable() {
        let temp_dir = fixture();
        let err = TreeEnumerator::new(temp_dir.path().join("top.md"), false)
            .enumerate("top.md")
            .unwrap_err();

        assert!(matches!(err, IndexError::DirectoryUnavailable { .. }));
    }
}

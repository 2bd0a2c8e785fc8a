//! Per-directory index configuration.
//!
//! [`IndexOptions`] is what the user writes: every field is optional and any
//! unknown field is carried as metadata. [`IndexOptions::resolve`] produces a
//! [`ResolvedIndexConfig`] with the defaults filled in, leaving the options
//! themselves untouched.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::callbacks::{
    Callback, CallbackRegistry, CompareFn, FilterFn, FormatFn, accept_all, descending_length,
    name_per_line,
};
use crate::error::{IndexError, Result};
use crate::file_map::{Metadata, normalize_key};

/// File name used for generated indexes when none is configured.
pub const DEFAULT_INDEX_FILENAME: &str = "index.list";

/// Metadata keys owned by the generated artifact itself.
const RESERVED_KEYS: &[&str] = &["files", "contents"];

/// Options for a single indexed directory, as supplied by the user.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Name of the generated file within the directory.
    pub filename: Option<String>,

    /// Whether to descend into subdirectories.
    pub recursive: Option<bool>,

    /// Which children to list.
    pub filter: Option<Callback<FilterFn>>,

    /// How to render each listed child.
    pub format: Option<Callback<FormatFn>>,

    /// How to order children.
    pub compare: Option<Callback<CompareFn>>,

    /// Extra fields copied onto the generated file.
    pub metadata: Metadata,
}

impl IndexOptions {
    /// Create empty options; every field takes its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generated file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set whether to descend into subdirectories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    /// Set the filter.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &crate::FileEntry) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Callback::Function(std::sync::Arc::new(filter)));
        self
    }

    /// Set the format.
    pub fn with_format<F>(mut self, format: F) -> Self
    where
        F: Fn(&str, &crate::FileEntry) -> String + Send + Sync + 'static,
    {
        self.format = Some(Callback::Function(std::sync::Arc::new(format)));
        self
    }

    /// Set the comparator.
    pub fn with_compare<F>(mut self, compare: F) -> Self
    where
        F: Fn(&str, &str) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.compare = Some(Callback::Function(std::sync::Arc::new(compare)));
        self
    }

    /// Add a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Parse options from a configuration value.
    ///
    /// `filter`, `format` and `compare` (or its alias `sort`) are callback
    /// names. Known fields with the wrong type are kept as raw values and
    /// reported when the directory is resolved.
    pub fn from_value(dir: &str, value: Value) -> Result<Self> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(IndexError::Config(format!(
                    "options for {dir} must be a table, got {}",
                    type_name(&other)
                )));
            }
        };

        let mut options = Self::new();
        for (key, value) in fields {
            let value = match (key.as_str(), value) {
                ("filename", Value::String(name)) => {
                    options.filename = Some(name);
                    continue;
                }
                ("recursive", Value::Bool(recursive)) => {
                    options.recursive = Some(recursive);
                    continue;
                }
                ("filter", Value::String(name)) => {
                    options.filter = Some(Callback::Named(name));
                    continue;
                }
                ("format", Value::String(name)) => {
                    options.format = Some(Callback::Named(name));
                    continue;
                }
                ("compare" | "sort", Value::String(name)) => {
                    options.compare = Some(Callback::Named(name));
                    continue;
                }
                (_, value) => value,
            };
            options.metadata.insert(key, value);
        }

        Ok(options)
    }

    /// Fill in defaults, producing a fully populated configuration.
    pub fn resolve(&self, dir: &str, registry: &CallbackRegistry) -> Result<ResolvedIndexConfig> {
        for key in ["filename", "recursive", "filter", "format", "compare", "sort"] {
            if let Some(value) = self.metadata.get(key) {
                return Err(invalid(
                    dir,
                    format!("`{key}` has unusable type {}", type_name(value)),
                ));
            }
        }

        let filter = match &self.filter {
            None => accept_all(),
            Some(callback) => lookup(dir, "filter", callback, |name| registry.filter(name))?,
        };
        let format = match &self.format {
            None => name_per_line(),
            Some(callback) => lookup(dir, "format", callback, |name| registry.format(name))?,
        };
        let compare = match &self.compare {
            None => descending_length(),
            Some(callback) => lookup(dir, "compare", callback, |name| registry.compare(name))?,
        };

        let mut metadata = self.metadata.clone();
        for key in RESERVED_KEYS {
            if metadata.remove(*key).is_some() {
                warn!("Ignoring reserved metadata key `{key}` for index of {dir}");
            }
        }

        Ok(ResolvedIndexConfig {
            dir: normalize_key(dir),
            filename: self
                .filename
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX_FILENAME.to_string()),
            recursive: self.recursive.unwrap_or(false),
            filter,
            format,
            compare,
            metadata,
        })
    }
}

/// Configuration for one directory with every default applied.
#[derive(Clone)]
pub struct ResolvedIndexConfig {
    /// Normalized directory key.
    pub dir: String,

    /// Generated file name.
    pub filename: String,

    /// Whether to descend into subdirectories.
    pub recursive: bool,

    /// Which children to list.
    pub filter: FilterFn,

    /// How to render each listed child.
    pub format: FormatFn,

    /// How to order children.
    pub compare: CompareFn,

    /// Extra fields for the generated file.
    pub metadata: Metadata,
}

impl ResolvedIndexConfig {
    /// File map key of the generated index.
    pub fn destination(&self) -> String {
        crate::file_map::join_key(&self.dir, &self.filename)
    }
}

impl std::fmt::Debug for ResolvedIndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedIndexConfig")
            .field("dir", &self.dir)
            .field("filename", &self.filename)
            .field("recursive", &self.recursive)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// The set of directories to index, keyed by path relative to the source root.
#[derive(Debug, Clone, Default)]
pub struct IndexesConfig {
    directories: BTreeMap<String, IndexOptions>,
}

impl IndexesConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to index.
    pub fn with_directory(mut self, dir: impl Into<String>, options: IndexOptions) -> Self {
        self.insert(dir, options);
        self
    }

    /// Add or replace a directory to index.
    pub fn insert(&mut self, dir: impl Into<String>, options: IndexOptions) {
        self.directories.insert(dir.into(), options);
    }

    /// Options for a directory.
    pub fn get(&self, dir: &str) -> Option<&IndexOptions> {
        self.directories.get(dir)
    }

    /// Directories and their options, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexOptions)> {
        self.directories.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of configured directories.
    pub fn len(&self) -> usize {
        self.directories.len()
    }

    /// Check if no directory is configured.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// Build the configuration from a value mapping directory keys to options.
    pub fn from_value(value: Value) -> Result<Self> {
        let directories = match value {
            Value::Object(directories) => directories,
            other => {
                return Err(IndexError::Config(format!(
                    "index configuration must be a table, got {}",
                    type_name(&other)
                )));
            }
        };

        let mut config = Self::new();
        for (dir, options) in directories {
            let options = IndexOptions::from_value(&dir, options)?;
            config.insert(dir, options);
        }
        Ok(config)
    }

    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)?;
        Self::from_value(serde_json::to_value(table)?)
    }

    /// Load from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("toml") => Self::from_toml_str(&text),
            _ => Err(IndexError::Config(format!(
                "unsupported configuration format: {}",
                path.display()
            ))),
        }
    }
}

fn lookup<F: Clone>(
    dir: &str,
    kind: &str,
    callback: &Callback<F>,
    find: impl FnOnce(&str) -> Option<F>,
) -> Result<F> {
    match callback {
        Callback::Function(f) => Ok(f.clone()),
        Callback::Named(name) => {
            find(name).ok_or_else(|| invalid(dir, format!("unknown {kind} `{name}`")))
        }
    }
}

fn invalid(dir: &str, reason: String) -> IndexError {
    IndexError::InvalidConfiguration {
        dir: dir.to_string(),
        reason,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cmp::Ordering;

    use crate::FileEntry;

    #[test]
    fn test_resolve_defaults() {
        let options = IndexOptions::new();
        let resolved = options.resolve("pub/", &CallbackRegistry::new()).unwrap();
        let entry = FileEntry::new("", DateTime::<Utc>::UNIX_EPOCH);

        assert_eq!(resolved.dir, "pub");
        assert_eq!(resolved.filename, DEFAULT_INDEX_FILENAME);
        assert_eq!(resolved.destination(), "pub/index.list");
        assert!(!resolved.recursive);
        assert!((resolved.filter)("x", &entry));
        assert_eq!((resolved.format)("x", &entry), "x\n");
        assert_eq!((resolved.compare)("abc", "a"), Ordering::Less);
        assert!(resolved.metadata.is_empty());
    }

    #[test]
    fn test_resolve_keeps_user_values() {
        let options = IndexOptions::new()
            .with_filename("ZZZ")
            .recursive(true)
            .with_format(|name, _| format!("[{name}]"))
            .with_metadata("title", "Title");

        let resolved = options.resolve("pub", &CallbackRegistry::new()).unwrap();
        let entry = FileEntry::new("", DateTime::<Utc>::UNIX_EPOCH);

        assert_eq!(resolved.destination(), "pub/ZZZ");
        assert!(resolved.recursive);
        assert_eq!((resolved.format)("a", &entry), "[a]");
        assert_eq!(resolved.metadata.get("title"), Some(&json!("Title")));

        // Resolution does not touch the user's options.
        assert!(options.filter.is_none());
        assert_eq!(options.metadata.len(), 1);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let registry = CallbackRegistry::new();
        let options = IndexOptions::new().with_metadata("title", "T");

        let first = options.resolve("pub", &registry).unwrap();
        let second = options.resolve("pub", &registry).unwrap();

        assert_eq!(first.destination(), second.destination());
        assert_eq!(first.metadata, second.metadata);
    }

    #[test]
    fn test_unknown_named_callback_is_invalid() {
        let options = IndexOptions::from_value("pub", json!({ "sort": "shuffle" })).unwrap();
        let err = options.resolve("pub", &CallbackRegistry::new()).unwrap_err();

        assert!(matches!(err, IndexError::InvalidConfiguration { .. }));
        assert_eq!(err.directory(), Some("pub"));
    }

    #[test]
    fn test_mistyped_field_is_invalid_at_resolution() {
        let options = IndexOptions::from_value("pub", json!({ "recursive": "yes" })).unwrap();
        assert!(options.metadata.contains_key("recursive"));

        let err = options.resolve("pub", &CallbackRegistry::new()).unwrap_err();
        assert!(matches!(err, IndexError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_reserved_metadata_is_dropped() {
        let options = IndexOptions::new()
            .with_metadata("files", json!(["x"]))
            .with_metadata("title", "T");
        let resolved = options.resolve("pub", &CallbackRegistry::new()).unwrap();

        assert!(!resolved.metadata.contains_key("files"));
        assert!(resolved.metadata.contains_key("title"));
    }

    #[test]
    fn test_from_json() {
        let config = IndexesConfig::from_json_str(
            r#"{
                "pub": { "filename": "ZZZ", "title": "Title" },
                "docs": { "recursive": true, "sort": "alphabetical" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.len(), 2);
        let keys: Vec<_> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["docs", "pub"]);

        let pub_options = config.get("pub").unwrap();
        assert_eq!(pub_options.filename.as_deref(), Some("ZZZ"));
        assert_eq!(pub_options.metadata.get("title"), Some(&json!("Title")));

        let docs = config.get("docs").unwrap();
        assert_eq!(docs.recursive, Some(true));
        assert!(matches!(docs.compare, Some(Callback::Named(ref n)) if n == "alphabetical"));
    }

    #[test]
    fn test_from_toml() {
        let config = IndexesConfig::from_toml_str(
            r#"
            [pub]
            filename = "INDEX"
            format = "markdown-link"

            ["blog/posts"]
            recursive = true
            "#,
        )
        .unwrap();

        assert_eq!(config.len(), 2);
        assert!(config.get("blog/posts").unwrap().recursive.unwrap());
        assert_eq!(config.get("pub").unwrap().filename.as_deref(), Some("INDEX"));
    }

    #[test]
    fn test_malformed_top_level_is_fatal() {
        assert!(matches!(
            IndexesConfig::from_json_str("[1, 2]"),
            Err(IndexError::Config(_))
        ));
        assert!(matches!(
            IndexesConfig::from_json_str(r#"{ "pub": 3 }"#),
            Err(IndexError::Config(_))
        ));
    }
}

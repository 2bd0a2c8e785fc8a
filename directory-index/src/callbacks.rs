//! Filter, format and compare callbacks.
//!
//! Callbacks can be supplied directly as closures, or by name when the
//! configuration comes from a file. Named callbacks are looked up in a
//! [`CallbackRegistry`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::file_map::FileEntry;

/// Decides whether a child appears in the listing.
pub type FilterFn = Arc<dyn Fn(&str, &FileEntry) -> bool + Send + Sync>;

/// Renders one content fragment for an accepted child.
pub type FormatFn = Arc<dyn Fn(&str, &FileEntry) -> String + Send + Sync>;

/// Orders two child names.
pub type CompareFn = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Name of the default filter.
pub const DEFAULT_FILTER: &str = "all";

/// Name of the default format.
pub const DEFAULT_FORMAT: &str = "name";

/// Name of the default comparator.
pub const DEFAULT_COMPARE: &str = "descending-length";

/// A callback given either directly or by registered name.
#[derive(Clone)]
pub enum Callback<F> {
    /// A callable value.
    Function(F),

    /// A name to look up in the [`CallbackRegistry`].
    Named(String),
}

impl<F> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Accept every child.
pub fn accept_all() -> FilterFn {
    Arc::new(|_: &str, _: &FileEntry| true)
}

/// Render the child name followed by a newline.
pub fn name_per_line() -> FormatFn {
    Arc::new(|name: &str, _: &FileEntry| format!("{name}\n"))
}

/// Order names by descending length, longest first.
pub fn descending_length() -> CompareFn {
    Arc::new(|a: &str, b: &str| b.len().cmp(&a.len()))
}

/// Registry of named callbacks usable from configuration files.
#[derive(Clone)]
pub struct CallbackRegistry {
    filters: HashMap<String, FilterFn>,
    formats: HashMap<String, FormatFn>,
    comparators: HashMap<String, CompareFn>,
}

impl CallbackRegistry {
    /// Create a registry holding the built-in callbacks.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_filter(DEFAULT_FILTER, accept_all());
        registry.register_filter(
            "files",
            Arc::new(|_: &str, entry: &FileEntry| !entry.stats.is_dir),
        );
        registry.register_filter(
            "visible",
            Arc::new(|name: &str, _: &FileEntry| {
                !name.split('/').any(|segment| segment.starts_with('.'))
            }),
        );

        registry.register_format(DEFAULT_FORMAT, name_per_line());
        registry.register_format(
            "path",
            Arc::new(|name: &str, entry: &FileEntry| {
                let suffix = if entry.stats.is_dir { "/" } else { "" };
                format!("{name}{suffix}\n")
            }),
        );
        registry.register_format(
            "markdown-link",
            Arc::new(|name: &str, entry: &FileEntry| {
                let title = entry
                    .meta("title")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or(name);
                format!("- [{title}]({name})\n")
            }),
        );

        registry.register_compare(DEFAULT_COMPARE, descending_length());
        registry.register_compare(
            "ascending-length",
            Arc::new(|a: &str, b: &str| a.len().cmp(&b.len())),
        );
        registry.register_compare("alphabetical", Arc::new(|a: &str, b: &str| a.cmp(b)));
        registry.register_compare(
            "reverse-alphabetical",
            Arc::new(|a: &str, b: &str| b.cmp(a)),
        );

        registry
    }

    /// Create a registry with no callbacks at all.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
            formats: HashMap::new(),
            comparators: HashMap::new(),
        }
    }

    /// Register a named filter, replacing any previous one.
    pub fn register_filter(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into(), filter);
    }

    /// Register a named format, replacing any previous one.
    pub fn register_format(&mut self, name: impl Into<String>, format: FormatFn) {
        self.formats.insert(name.into(), format);
    }

    /// Register a named comparator, replacing any previous one.
    pub fn register_compare(&mut self, name: impl Into<String>, compare: CompareFn) {
        self.comparators.insert(name.into(), compare);
    }

    /// Get a filter by name.
    pub fn filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).cloned()
    }

    /// Get a format by name.
    pub fn format(&self, name: &str) -> Option<FormatFn> {
        self.formats.get(name).cloned()
    }

    /// Get a comparator by name.
    pub fn compare(&self, name: &str) -> Option<CompareFn> {
        self.comparators.get(name).cloned()
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().collect();
        let mut formats: Vec<_> = self.formats.keys().collect();
        let mut comparators: Vec<_> = self.comparators.keys().collect();
        filters.sort();
        formats.sort();
        comparators.sort();

        f.debug_struct("CallbackRegistry")
            .field("filters", &filters)
            .field("formats", &formats)
            .field("comparators", &comparators)
            .finish()
    }
}

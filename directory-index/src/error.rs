//! Error types for directory indexing.

use thiserror::Error;

/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while indexing directories.
///
/// The first four variants are scoped to a single configured directory and are
/// collected into a [`RunReport`](crate::RunReport) instead of aborting the run.
/// The remaining variants are global and are returned to the host.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The configured directory does not resolve to a readable directory.
    #[error("directory unavailable: {dir}: {source}")]
    DirectoryUnavailable {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    /// An enumerated child has no entry in the file map.
    #[error("stale entry reference in {dir}: {path} is not in the file map")]
    StaleEntryReference { dir: String, path: String },

    /// A configured callback or field cannot be used.
    #[error("invalid configuration for {dir}: {reason}")]
    InvalidConfiguration { dir: String, reason: String },

    /// The enumeration task for a directory did not finish.
    #[error("indexing task failed for {dir}: {reason}")]
    TaskFailed { dir: String, reason: String },

    /// Malformed top-level configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Front matter could not be parsed.
    #[error("front matter error in {path}: {source}")]
    FrontMatter {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A source file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Source tree traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl IndexError {
    /// The configured directory this error is scoped to, if any.
    pub fn directory(&self) -> Option<&str> {
        match self {
            Self::DirectoryUnavailable { dir, .. }
            | Self::StaleEntryReference { dir, .. }
            | Self::InvalidConfiguration { dir, .. }
            | Self::TaskFailed { dir, .. } => Some(dir),
            _ => None,
        }
    }
}

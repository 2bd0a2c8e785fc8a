//! # Directory Index
//!
//! This crate generates index files for directories of a static site build.
//! For each configured directory it lists the children, optionally
//! recursively, and inserts a generated file into the shared [`FileMap`]
//! holding the ordered listing and its rendered contents.
//!
//! ## Features
//!
//! - **Shallow or Recursive Listings**: direct children, or every nested file
//! - **Callbacks**: filter, format and compare per directory, as closures or by name
//! - **Metadata Passthrough**: extra configuration fields land on the generated file
//! - **Isolated Failures**: one broken directory never stops the others
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Directory Indexer                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  IndexOptions ──► ResolvedIndexConfig ──► TreeEnumerator        │
//! │                          │                      │               │
//! │                          ▼                      ▼               │
//! │                   IndexBuilder ◄──────────── Children           │
//! │                          │                                      │
//! │                          ▼                                      │
//! │              FileMap["{dir}/index.list"]                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codex_directory_index::{DirectoryIndexer, IndexOptions, IndexesConfig, SourceTree};
//!
//! let source = SourceTree::new("site/src");
//! let mut files = source.read()?;
//!
//! let posts = IndexOptions::new().with_metadata("title", "Posts");
//! let indexer = DirectoryIndexer::new(IndexesConfig::new().with_directory("posts", posts));
//! let report = indexer.run(&mut files, &source).await?;
//! ```

pub mod builder;
pub mod callbacks;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod file_map;
pub mod host;
pub mod indexer;
pub mod pipeline;

pub use builder::IndexBuilder;
pub use callbacks::{Callback, CallbackRegistry, CompareFn, FilterFn, FormatFn};
pub use config::{DEFAULT_INDEX_FILENAME, IndexOptions, IndexesConfig, ResolvedIndexConfig};
pub use enumerator::{Child, ChildKind, TreeEnumerator};
pub use error::{IndexError, Result};
pub use file_map::{FileEntry, FileMap, FileStat, IndexEntry, Metadata};
pub use host::{BuildHost, SourceTree};
pub use indexer::{DirectoryFailure, DirectoryIndexer, RunReport};
pub use pipeline::{Pipeline, Plugin};
